//! Gamedata: the address table
//!
//! Every address the tool touches, captured against a reference image base,
//! plus the player structure offsets. A built-in table matches the reference
//! build; a `gamedata.json` deployed next to the config replaces it without
//! recompiling. Addresses may be written as JSON numbers or `"0x..."` strings.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::hooks::SavedRegister;
use crate::layout::PhysentLayout;
use strafe_sdk::reference;

/// Errors that can occur when loading gamedata
#[derive(Debug, Error)]
pub enum GamedataError {
    #[error("Failed to read gamedata file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse gamedata JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Address of '{0}' is outside the reference image")]
    BelowImageBase(String),
}

/// Accept `1234` or `"0x4d2"`
fn address<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(usize),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => {
            let digits = s.trim_start_matches("0x").trim_start_matches("0X");
            usize::from_str_radix(digits, 16).map_err(serde::de::Error::custom)
        }
    }
}

/// Entry points that get inline hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionTable {
    #[serde(deserialize_with = "address")]
    pub forward: usize,
    #[serde(deserialize_with = "address")]
    pub backward: usize,
    #[serde(deserialize_with = "address")]
    pub left: usize,
    #[serde(deserialize_with = "address")]
    pub right: usize,
    #[serde(deserialize_with = "address")]
    pub jump: usize,
    #[serde(deserialize_with = "address")]
    pub check_input: usize,
}

/// A mid-hook site and how many whole-instruction bytes it may overwrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidHookSite {
    pub name: String,
    #[serde(deserialize_with = "address")]
    pub address: usize,
    pub size: usize,
    /// Register holding the physent being moved at this site; when absent any
    /// saved register may match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_register: Option<SavedRegister>,
}

/// The full address table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gamedata {
    /// Base the addresses below were captured against
    #[serde(deserialize_with = "address")]
    pub image_base: usize,

    /// Local player pointer
    #[serde(deserialize_with = "address")]
    pub local_player: usize,

    /// Bytes between the player object and its field block
    #[serde(default = "default_header")]
    pub object_header: usize,

    pub functions: FunctionTable,

    #[serde(default)]
    pub mid_hooks: Vec<MidHookSite>,

    #[serde(default)]
    pub physent: PhysentLayout,
}

fn default_header() -> usize {
    std::mem::size_of::<usize>()
}

impl Gamedata {
    /// Table for the reference build
    pub fn builtin() -> Self {
        Self {
            image_base: reference::IMAGE_BASE,
            local_player: reference::LOCAL_PLAYER,
            object_header: default_header(),
            functions: FunctionTable {
                forward: reference::PLAYER_FORWARD,
                backward: reference::PLAYER_BACKWARD,
                left: reference::PLAYER_LEFT,
                right: reference::PLAYER_RIGHT,
                jump: reference::PLAYER_JUMP,
                check_input: reference::CHECK_INPUT,
            },
            mid_hooks: vec![
                MidHookSite {
                    name: "moveplayer_friction_ground".into(),
                    address: reference::MOVEPLAYER_FRICTION_GROUND,
                    size: reference::MOVEPLAYER_FRICTION_GROUND_SIZE,
                    entity_register: None,
                },
                MidHookSite {
                    name: "moveplayer_friction_air".into(),
                    address: reference::MOVEPLAYER_FRICTION_AIR,
                    size: reference::MOVEPLAYER_FRICTION_AIR_SIZE,
                    entity_register: None,
                },
            ],
            physent: PhysentLayout::BUILTIN,
        }
    }

    /// Load gamedata from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, GamedataError> {
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content)
    }

    /// Load gamedata from a JSON string
    pub fn load_from_str(json: &str) -> Result<Self, GamedataError> {
        let gamedata: Gamedata = serde_json::from_str(json)?;
        gamedata.validate()?;

        tracing::info!(
            "Loaded gamedata: base {:#x}, {} mid-hook sites",
            gamedata.image_base,
            gamedata.mid_hooks.len()
        );

        Ok(gamedata)
    }

    /// Load `path` if it exists, otherwise use the built-in table
    pub fn load_or_builtin<P: AsRef<Path>>(path: P) -> Result<Self, GamedataError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("No gamedata at {:?}, using built-in table", path);
            Ok(Self::builtin())
        }
    }

    /// Every named address, for validation and logging
    pub fn addresses(&self) -> Vec<(&str, usize)> {
        let f = &self.functions;
        let mut out = vec![
            ("local_player", self.local_player),
            ("forward", f.forward),
            ("backward", f.backward),
            ("left", f.left),
            ("right", f.right),
            ("jump", f.jump),
            ("check_input", f.check_input),
        ];
        out.extend(self.mid_hooks.iter().map(|s| (s.name.as_str(), s.address)));
        out
    }

    fn validate(&self) -> Result<(), GamedataError> {
        match self
            .addresses()
            .into_iter()
            .find(|&(_, address)| address < self.image_base)
        {
            Some((name, _)) => Err(GamedataError::BelowImageBase(name.to_string())),
            None => Ok(()),
        }
    }
}
