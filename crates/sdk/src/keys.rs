//! Virtual-key codes
//!
//! Values follow the Windows `VK_*` table, which is what the key-state query
//! expects.

pub const VK_SPACE: u8 = 0x20;
pub const VK_F5: u8 = 0x74;
pub const VK_F6: u8 = 0x75;
