//! Probe, remove and unbind

use alloc::vec::Vec;
use log::{debug, error, warn};

use crate::{ClassId, DevId, DmFlags, DriverModel, ErrorKind, RemoveFlags, Result};

impl DriverModel {
    /// Activate a device, probing its ancestors first
    ///
    /// Probing an active device does nothing. Reaching a device that is still
    /// being probed further up the call chain is a dependency cycle. A failed
    /// probe leaves the device bound and inactive; ancestors probed on its
    /// behalf stay active.
    pub fn probe(&mut self, dev: DevId) -> Result<()> {
        let flags = self.dev(dev)?.flags();
        if flags.contains(DmFlags::ACTIVATED) {
            return Ok(());
        }
        if flags.contains(DmFlags::PROBING) {
            error!("{}: probe cycle detected", self.name(dev));
            return Err(ErrorKind::CircularDependency);
        }
        if flags.contains(DmFlags::REMOVING) {
            return Err(ErrorKind::Busy);
        }

        self.set_flags(dev, DmFlags::PROBING)?;
        let mut probed = false;
        match self.run_probe(dev, &mut probed) {
            Ok(()) => {
                self.clear_flags(dev, DmFlags::PROBING)?;
                self.set_flags(dev, DmFlags::ACTIVATED)?;
                debug!("{}: probed", self.name(dev));
                Ok(())
            }
            Err(e) => {
                warn!("{}: probe failed: {}", self.name(dev), e);
                if probed {
                    if let Some(remove) = self.dev(dev)?.driver().remove {
                        if let Err(e) = remove(self, dev) {
                            warn!("{}: remove after failed probe: {}", self.name(dev), e);
                        }
                    }
                }
                self.free_active_storage(dev)?;
                self.clear_flags(dev, DmFlags::PROBING | DmFlags::PLATDATA_VALID)?;
                Err(e)
            }
        }
    }

    fn run_probe(&mut self, dev: DevId, probed: &mut bool) -> Result<()> {
        let driver = self.dev(dev)?.driver();
        let class = self.class_driver(dev)?;
        let parent = self.dev(dev)?.parent();

        if let Some(p) = parent {
            self.probe(p)?;
        }
        self.alloc_active_storage(dev)?;

        // Pin controllers select their own state once their driver is up
        if parent.is_some() && !matches!(driver.id, ClassId::Pinctrl | ClassId::Pinconfig) {
            if let Some(hook) = self.catalog().state_hook() {
                if let Err(e) = hook(self, dev) {
                    debug!("{}: default state not applied: {}", self.name(dev), e);
                }
            }
        }

        if let Some(p) = parent {
            if let Some(hook) = self.class_driver(p)?.child_pre_probe {
                hook(self, dev)?;
            }
            if let Some(hook) = self.dev(p)?.driver().child_pre_probe {
                hook(self, dev)?;
            }
        }
        if let Some(hook) = class.pre_probe {
            hook(self, dev)?;
        }
        if !self.dev(dev)?.flags().contains(DmFlags::PLATDATA_VALID) {
            if let Some(hook) = driver.of_to_plat {
                hook(self, dev)?;
            }
            self.set_flags(dev, DmFlags::PLATDATA_VALID)?;
        }
        if let Some(hook) = driver.probe {
            hook(self, dev)?;
        }
        *probed = true;
        if let Some(hook) = class.post_probe {
            hook(self, dev)?;
        }
        if let Some(p) = parent {
            if let Some(hook) = self.class_driver(p)?.child_post_probe {
                hook(self, dev)?;
            }
        }
        Ok(())
    }

    /// Deactivate one device whose children are all inactive
    ///
    /// If the driver refuses, the uclass `post_probe` runs again so the
    /// device goes back to the state it was in, and the error is returned.
    pub fn remove(&mut self, dev: DevId) -> Result<()> {
        let device = self.dev(dev)?;
        if !device.is_active() {
            return Ok(());
        }
        let active_child = device
            .children()
            .iter()
            .any(|c| self.device(*c).is_some_and(|c| c.is_active()));
        if active_child {
            error!("{}: has active children", device.name());
            return Err(ErrorKind::HasActiveChildren);
        }

        let driver = device.driver();
        let parent = device.parent();
        let class = self.class_driver(dev)?;

        self.set_flags(dev, DmFlags::REMOVING)?;
        let result = self.run_remove(dev, class.pre_remove, driver.remove);
        self.clear_flags(dev, DmFlags::REMOVING)?;
        if let Err(e) = result {
            if let Some(hook) = class.post_probe {
                if let Err(e) = hook(self, dev) {
                    warn!("{}: post_probe after failed remove: {}", self.name(dev), e);
                }
            }
            return Err(e);
        }

        self.free_active_storage(dev)?;
        self.clear_flags(dev, DmFlags::ACTIVATED | DmFlags::PLATDATA_VALID)?;

        if let Some(p) = parent {
            if let Some(hook) = self.dev(p)?.driver().child_post_remove {
                if let Err(e) = hook(self, dev) {
                    warn!("{}: child_post_remove: {}", self.name(p), e);
                }
            }
        }
        debug!("{}: removed", self.name(dev));
        Ok(())
    }

    fn run_remove(
        &mut self,
        dev: DevId,
        pre_remove: Option<crate::Hook>,
        remove: Option<crate::Hook>,
    ) -> Result<()> {
        if let Some(hook) = pre_remove {
            hook(self, dev)?;
        }
        if let Some(hook) = remove {
            hook(self, dev)?;
        }
        Ok(())
    }

    /// Remove a device and its descendants, children first
    ///
    /// Only devices whose driver flags are selected by `flags` are removed. A
    /// device that was skipped keeps its ancestors active, which is not an
    /// error.
    pub fn remove_subtree(&mut self, dev: DevId, flags: RemoveFlags) -> Result<()> {
        let children = self.dev(dev)?.children().to_vec();
        let mut first = None;
        for child in children {
            if let Err(e) = self.remove_subtree(child, flags) {
                first.get_or_insert(e);
            }
        }
        if let Some(e) = first {
            return Err(e);
        }

        let driver_flags = self.dev(dev)?.driver().flags;
        if !flags.selects(driver_flags) {
            return Ok(());
        }
        match self.remove(dev) {
            Err(ErrorKind::HasActiveChildren) => Ok(()),
            other => other,
        }
    }

    /// Unbind an inactive device and everything below it
    pub fn unbind(&mut self, dev: DevId) -> Result<()> {
        let flags = self.dev(dev)?.flags();
        if flags.intersects(DmFlags::ACTIVATED | DmFlags::PROBING | DmFlags::REMOVING) {
            error!("{}: cannot unbind while active", self.name(dev));
            return Err(ErrorKind::InvalidState);
        }

        let children = self.dev(dev)?.children().to_vec();
        for child in children {
            self.unbind(child)?;
        }

        let driver = self.dev(dev)?.driver();
        if let Some(hook) = driver.unbind {
            hook(self, dev)?;
        }
        if let Some(hook) = self.class_driver(dev)?.pre_unbind {
            hook(self, dev)?;
        }
        debug!("{}: unbound", self.name(dev));
        self.destroy_device(dev)
    }

    /// Tear the whole model down: remove and unbind every device, then
    /// destroy the uclasses
    pub fn uninit(&mut self) -> Result<()> {
        let roots: Vec<DevId> = self.roots().to_vec();
        for dev in roots.iter().copied() {
            self.remove_subtree(dev, RemoveFlags::NORMAL)?;
        }
        for dev in roots {
            self.unbind(dev)?;
        }
        for id in self.class_ids() {
            let destroy = self.class(id).and_then(|c| c.driver().destroy);
            if let Some(hook) = destroy {
                if let Err(e) = hook(self, id) {
                    warn!("dm: destroying uclass {:?}: {}", id, e);
                }
            }
            self.drop_class(id);
        }
        Ok(())
    }
}
