/// Identifies a uclass: the family of drivers sharing one operations table
#[repr(C)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ClassId {
	/* These are used internally by driver model */
	Root = 0,
	Test,
	TestBus,
	TestProbe,

	/* oreboot uclasses start here - in alphabetical order */
	Dsa,		/* Distributed (Ethernet) Switch Architecture */
	Eth,		/* Ethernet device */
	Pinconfig,	/* Pin configuration node device */
	Pinctrl,	/* Pinctrl (pin muxing/configuration) device */
	Regulator,	/* Regulator device */
	Serial,		/* Serial UART */
	SimpleBus,	/* Bus with child devices */
}
