//! Uclasses and drivers built on the device model core
//!
//! Each subsystem contributes a uclass, its operations table and the
//! uclass-wide helpers consumers call. The sandbox drivers keep their
//! hardware state in memory and record what they were asked to do.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

use device::{Catalog, Result};

#[cfg(feature = "eth")]
pub mod net;
#[cfg(feature = "pinctrl")]
pub mod pinctrl;
#[cfg(feature = "regulator")]
pub mod regulator;
#[cfg(feature = "serial")]
pub mod serial;

/// Install the catalog of every uclass and driver enabled in this build
pub fn catalog() -> Result<&'static Catalog> {
    device::catalog::install(|| {
        let builder = Catalog::builder();

        #[cfg(feature = "pinctrl")]
        let builder = builder
            .class(&pinctrl::PINCTRL_CLASS)
            .class(&pinctrl::PINCONFIG_CLASS)
            .driver(&pinctrl::PINCONFIG_DRIVER)
            .state_hook(pinctrl::select_default_state);
        #[cfg(all(feature = "pinctrl", feature = "sandbox"))]
        let builder = builder.drivers(&[
            &pinctrl::sandbox::SANDBOX_PINCTRL_DRIVER,
            &pinctrl::sandbox::SANDBOX_PINCTRL_NOMUX_DRIVER,
        ]);

        #[cfg(feature = "regulator")]
        let builder = builder
            .class(&regulator::REGULATOR_CLASS)
            .driver(&regulator::fixed::FIXED_REGULATOR_DRIVER);
        #[cfg(all(feature = "regulator", feature = "sandbox"))]
        let builder = builder.drivers(&[
            &regulator::sandbox::SANDBOX_REGULATOR_DRIVER,
            &regulator::sandbox::SANDBOX_SUSPEND_REGULATOR_DRIVER,
        ]);

        #[cfg(feature = "eth")]
        let builder = builder.class(&net::eth::ETH_CLASS);
        #[cfg(all(feature = "eth", feature = "sandbox"))]
        let builder = builder.driver(&net::sandbox::SANDBOX_ETH_DRIVER);
        #[cfg(feature = "dsa")]
        let builder = builder
            .class(&net::dsa::DSA_CLASS)
            .driver(&net::dsa::DSA_PORT_DRIVER);
        #[cfg(all(feature = "dsa", feature = "sandbox"))]
        let builder = builder.driver(&net::dsa_sandbox::SANDBOX_DSA_DRIVER);

        #[cfg(feature = "serial")]
        let builder = builder.class(&serial::SERIAL_CLASS);
        #[cfg(all(feature = "serial", feature = "sandbox"))]
        let builder = builder.drivers(&[
            &serial::sandbox::SANDBOX_SERIAL_DRIVER,
            &serial::sandbox::SANDBOX_SERIAL_CHAR_DRIVER,
        ]);

        builder.build()
    })
}
