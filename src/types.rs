use serde::{Deserialize, Serialize};
use shrinkwraprs::Shrinkwrap;

macro_rules! impl_primitive_num {
    (pub struct $outer:ident($tname:ty)) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            Serialize,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Deserialize,
            Shrinkwrap,
        )]
        #[serde(transparent)]
        pub struct $outer(pub $tname);

        impl std::fmt::Display for $outer {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<$tname> for $outer {
            fn from(value: $tname) -> Self {
                Self(value)
            }
        }
    };
}

impl_primitive_num!(pub struct ChainId(u64));
impl_primitive_num!(pub struct Confirmations(u64));

/// Chain id shared by hardhat and anvil development nodes.
pub const LOCAL_CHAIN_ID: ChainId = ChainId(31337);

impl ChainId {
    pub fn is_local(&self) -> bool {
        *self == LOCAL_CHAIN_ID
    }
}
