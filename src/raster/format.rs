// ============================================================================
// PIXEL FORMAT CATALOG — sample types, color roles, destination layouts
// ============================================================================
//
// Two pure lookup tables drive the decoder:
//   SampleType → PixelFormat   (which packed RGBA layout a band type lands in)
//   ColorRole  → channel       (where in an interleaved pixel a band is written)
//
// Both return `Option`: Red legitimately sits at offset 0, so there is no
// "zero means unsupported" sentinel anywhere in this module.
// ============================================================================

/// Element type of the samples stored in one source band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SampleType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl SampleType {
    /// Size of one sample in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            SampleType::U8 | SampleType::I8 => 1,
            SampleType::U16 | SampleType::I16 => 2,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 4,
            SampleType::F64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SampleType::U8 => "u8",
            SampleType::I8 => "i8",
            SampleType::U16 => "u16",
            SampleType::I16 => "i16",
            SampleType::U32 => "u32",
            SampleType::I32 => "i32",
            SampleType::F32 => "f32",
            SampleType::F64 => "f64",
        }
    }
}

impl std::fmt::Display for SampleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Semantic meaning a source format assigns to a band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorRole {
    Red,
    Green,
    Blue,
    Alpha,
    Gray,
    Palette,
    Undefined,
}

/// Packed, interleaved destination layout. Channel order is always R, G, B, A.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8 bits per channel.
    Rgba8,
    /// 16 bits per channel, native byte order.
    Rgba16,
}

impl PixelFormat {
    pub const CHANNEL_COUNT: usize = 4;

    pub fn channel_count(self) -> usize {
        Self::CHANNEL_COUNT
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 1,
            PixelFormat::Rgba16 => 2,
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        self.channel_count() * self.bytes_per_sample()
    }

    /// Maximum representable sample value, as it is laid out in the buffer.
    pub fn max_sample_bytes(self) -> &'static [u8] {
        match self {
            PixelFormat::Rgba8 => &[0xFF],
            PixelFormat::Rgba16 => &[0xFF, 0xFF],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::Rgba8 => "RGBA 8-bit",
            PixelFormat::Rgba16 => "RGBA 16-bit",
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Destination format for a source sample type, or `None` when the viewer
/// cannot display that type without converting it.
pub fn destination_format(sample_type: SampleType) -> Option<PixelFormat> {
    match sample_type {
        SampleType::U8 => Some(PixelFormat::Rgba8),
        SampleType::U16 => Some(PixelFormat::Rgba16),
        SampleType::I8
        | SampleType::I16
        | SampleType::U32
        | SampleType::I32
        | SampleType::F32
        | SampleType::F64 => None,
    }
}

/// Channel index (0..4) a band with this role is written to.
pub fn channel_offset(role: ColorRole) -> Option<usize> {
    match role {
        ColorRole::Red => Some(0),
        ColorRole::Green => Some(1),
        ColorRole::Blue => Some(2),
        ColorRole::Alpha => Some(3),
        ColorRole::Gray | ColorRole::Palette | ColorRole::Undefined => None,
    }
}

/// Per-band metadata gathered once at the start of a decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BandDescriptor {
    /// 1-based band index, as the dataset numbers them.
    pub index: usize,
    pub sample_type: SampleType,
    pub color_role: ColorRole,
}

impl BandDescriptor {
    /// Channel this band fills, if any.
    pub fn channel(&self) -> Option<usize> {
        channel_offset(self.color_role)
    }
}
