pub mod common;
pub mod create;
pub mod inspect_abi;
pub mod verify;

pub use self::common::ContractSpec;
pub use self::create::{ForgeCreate, ForgeOutput};
pub use self::inspect_abi::ForgeInspectAbi;
pub use self::verify::{ForgeVerify, MissingSetting};
