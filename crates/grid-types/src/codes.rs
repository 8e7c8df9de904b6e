//! Asset, inventory, and sale type codes.
//!
//! Each code has a numeric wire value and a short legacy text name used by the
//! record text format (`object`, `lsltext`, `callcard`, ...).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        $name:ident : $repr:ty, kind = $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every known variant, in code order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            /// Numeric wire code.
            pub const fn code(self) -> $repr {
                match self {
                    $( $name::$variant => $code ),+
                }
            }

            /// Canonical short text name.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }

            /// Look up by canonical short text name.
            pub fn from_name(name: &str) -> Result<Self, TypeError> {
                match name {
                    $( $text => Ok($name::$variant), )+
                    other => Err(TypeError::UnknownName {
                        kind: $kind,
                        name: other.to_string(),
                    }),
                }
            }

            fn lookup_code(code: $repr) -> Option<Self> {
                match code {
                    $( $code => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_name(s)
            }
        }
    };
}

code_enum! {
    /// The kind of content an asset holds.
    AssetType: i8, kind = "asset type" {
        Unknown = -1 => "unknown",
        Texture = 0 => "texture",
        Sound = 1 => "sound",
        CallingCard = 2 => "callcard",
        Landmark = 3 => "landmark",
        Clothing = 5 => "clothing",
        /// Primitive that can contain textures, sounds, scripts and more.
        Object = 6 => "object",
        Notecard = 7 => "notecard",
        /// A collection of inventory items ("category").
        Folder = 8 => "category",
        RootFolder = 9 => "root",
        LslText = 10 => "lsltext",
        LslBytecode = 11 => "lslbyte",
        TextureTga = 12 => "txtr_tga",
        Bodypart = 13 => "bodypart",
        TrashFolder = 14 => "trash",
        SnapshotFolder = 15 => "snapshot",
        LostAndFoundFolder = 16 => "lstndfnd",
        SoundWav = 17 => "snd_wav",
        ImageTga = 18 => "img_tga",
        ImageJpeg = 19 => "jpeg",
        Animation = 20 => "animatn",
        Gesture = 21 => "gesture",
        Simstate = 22 => "simstate",
        Link = 24 => "link",
        LinkFolder = 25 => "link_f",
        Mesh = 49 => "mesh",
    }
}

code_enum! {
    /// How the viewer presents an inventory item.
    InventoryType: i8, kind = "inventory type" {
        Unknown = -1 => "unknown",
        Texture = 0 => "texture",
        Sound = 1 => "sound",
        CallingCard = 2 => "callcard",
        Landmark = 3 => "landmark",
        Object = 6 => "object",
        Notecard = 7 => "notecard",
        Folder = 8 => "category",
        RootFolder = 9 => "root",
        Lsl = 10 => "script",
        Snapshot = 15 => "snapshot",
        Attachment = 17 => "attach",
        Wearable = 18 => "wearable",
        Animation = 19 => "animation",
        Gesture = 20 => "gesture",
        Mesh = 22 => "mesh",
    }
}

code_enum! {
    /// Sale status of an item.
    SaleType: u8, kind = "sale type" {
        /// Not for sale.
        Not = 0 => "not",
        /// The original is for sale.
        Original = 1 => "orig",
        /// Copies are for sale.
        Copy = 2 => "copy",
        /// The contents of the object are for sale.
        Contents = 3 => "cntn",
    }
}

impl AssetType {
    /// Map a wire code, falling back to [`AssetType::Unknown`].
    pub fn from_code(code: i8) -> Self {
        Self::lookup_code(code).unwrap_or(AssetType::Unknown)
    }
}

impl Default for AssetType {
    fn default() -> Self {
        AssetType::Unknown
    }
}

impl InventoryType {
    /// Map a wire code, falling back to [`InventoryType::Unknown`].
    pub fn from_code(code: i8) -> Self {
        Self::lookup_code(code).unwrap_or(InventoryType::Unknown)
    }
}

impl Default for InventoryType {
    fn default() -> Self {
        InventoryType::Unknown
    }
}

impl SaleType {
    /// Map a wire code. Sale types have no "unknown" fallback.
    pub fn from_code(code: u8) -> Result<Self, TypeError> {
        Self::lookup_code(code).ok_or(TypeError::UnknownCode {
            kind: "sale type",
            code: i16::from(code),
        })
    }
}

impl Default for SaleType {
    fn default() -> Self {
        SaleType::Not
    }
}
