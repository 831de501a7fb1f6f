use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

macro_rules! impl_id {
    ($ident:ident) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Copy, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $ident(pub Uuid);

        impl $ident {
            pub fn new_random() -> Self {
                $ident(Uuid::new_v4())
            }
        }

        impl From<Uuid> for $ident {
            fn from(value: Uuid) -> Self {
                $ident(value)
            }
        }

        impl FromStr for $ident {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map($ident)
            }
        }

        impl Display for $ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_fmt(format_args!(concat!(stringify!($ident), "({})"), self.0))
            }
        }
    };
}

impl_id!(AssetId);
impl_id!(UsageId);
impl_id!(LicenseId);
impl_id!(DealerId);
