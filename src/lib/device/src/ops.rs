use core::any::Any;

use crate::{ClassId, DevId, DriverModel, ErrorKind, Result};

/// A uclass operations table
///
/// Each uclass defines one table type, a struct of optional function
/// pointers, and ties it to its [`ClassId`] here. The catalog refuses a
/// driver whose table belongs to another uclass, so a lookup through
/// [`DriverModel::ops`] can never see the wrong shape.
pub trait ClassOps: Any + Send + Sync {
    const CLASS: ClassId;
}

/// A driver's operations table, tagged with the uclass it belongs to
#[derive(Clone, Copy)]
pub struct Ops {
    class: Option<ClassId>,
    table: Option<&'static (dyn Any + Send + Sync)>,
}

impl Ops {
    /// No operations: every capability reports `NotImplemented`
    pub const NONE: Self = Self {
        class: None,
        table: None,
    };

    pub const fn new<O: ClassOps>(table: &'static O) -> Self {
        Self {
            class: Some(O::CLASS),
            table: Some(table),
        }
    }

    /// Uclass the table belongs to, `None` for a driver without operations
    pub fn class(&self) -> Option<ClassId> {
        self.class
    }

    fn get<O: ClassOps>(&self) -> Option<&'static O> {
        self.table?.downcast_ref::<O>()
    }
}

impl DriverModel {
    /// The device's operations table, typed for its uclass
    pub fn ops<O: ClassOps>(&self, dev: DevId) -> Result<&'static O> {
        let driver = self.dev(dev)?.driver;
        if driver.id != O::CLASS {
            return Err(ErrorKind::OpsMismatch);
        }
        driver.ops.get::<O>().ok_or(ErrorKind::NotImplemented)
    }

    /// Select one capability from the device's operations table
    ///
    /// An absent entry is reported as `NotImplemented` without anything
    /// being called.
    pub fn capability<O: ClassOps, F>(
        &self,
        dev: DevId,
        select: impl FnOnce(&'static O) -> Option<F>,
    ) -> Result<F> {
        let ops = self.ops::<O>(dev)?;
        select(ops).ok_or_else(|| {
            log::debug!("{}: capability not implemented", self.name(dev));
            ErrorKind::NotImplemented
        })
    }
}

/// Invoke a capability of a device, or return `NotImplemented`
///
/// ```ignore
/// invoke!(dm, dev, RegulatorOps, set_enable, true)
/// ```
/// expands to looking up `set_enable` in the device's `RegulatorOps` and
/// calling it as `set_enable(dm, dev, true)`, returning its result verbatim.
#[macro_export]
macro_rules! invoke {
    ($dm:expr, $dev:expr, $ops:ty, $field:ident $(, $arg:expr)* $(,)?) => {{
        let dm: &mut $crate::DriverModel = $dm;
        let dev: $crate::DevId = $dev;
        match dm.capability::<$ops, _>(dev, |ops| ops.$field) {
            Ok(f) => f(dm, dev $(, $arg)*),
            Err(e) => Err(e),
        }
    }};
}
