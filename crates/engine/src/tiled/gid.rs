pub const GID_FLIP_X: u32 = 0x8000_0000;
pub const GID_FLIP_Y: u32 = 0x4000_0000;
pub const GID_ROTATE: u32 = 0x2000_0000;
pub const GID_MASK: u32 = !(GID_FLIP_X | GID_FLIP_Y | GID_ROTATE);

/// Orientation bits stored in the top of an encoded tile reference.
///
/// `rotate` is the diagonal flip: x and y axes are swapped before the horizontal and
/// vertical flips are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TileFlags {
    pub flip_x: bool,
    pub flip_y: bool,
    pub rotate: bool,
}

impl TileFlags {
    pub const NONE: TileFlags = TileFlags {
        flip_x: false,
        flip_y: false,
        rotate: false,
    };

    pub fn is_identity(&self) -> bool {
        !(self.flip_x || self.flip_y || self.rotate)
    }
}

pub fn decode_gid(raw: u32) -> (u32, TileFlags) {
    let flags = TileFlags {
        flip_x: raw & GID_FLIP_X != 0,
        flip_y: raw & GID_FLIP_Y != 0,
        rotate: raw & GID_ROTATE != 0,
    };
    (raw & GID_MASK, flags)
}

/// Bits of `gid` above the mask are dropped.
pub fn encode_gid(gid: u32, flags: TileFlags) -> u32 {
    let mut raw = gid & GID_MASK;
    if flags.flip_x {
        raw |= GID_FLIP_X;
    }
    if flags.flip_y {
        raw |= GID_FLIP_Y;
    }
    if flags.rotate {
        raw |= GID_ROTATE;
    }
    raw
}
