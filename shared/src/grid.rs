use thiserror::Error;

/// Codec-native coding-unit width in pixels.
pub const MACROBLOCK_PX: u32 = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("grid dimensions are not initialized")]
    NotInitialized,
    #[error("unusable stream init: {width}x{height} mbWidth={mb_width}")]
    InvalidInit { width: u32, height: u32, mb_width: u32 },
}

/// Block geometry derived from a stream-init message. The display block
/// size is a multiple of the codec macroblock chosen by the server, not
/// the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridDescriptor {
    pub width_px: u32,
    pub height_px: u32,
    pub grid_width: u32,
    pub grid_height: u32,
    pub block_size: u32,
}

impl GridDescriptor {
    pub fn from_init(width: u32, height: u32, mb_width: u32) -> Result<Self, GridError> {
        let invalid = GridError::InvalidInit {
            width,
            height,
            mb_width,
        };
        if width == 0 || height == 0 || mb_width == 0 || width % MACROBLOCK_PX != 0 {
            return Err(invalid);
        }
        let macroblocks = width / MACROBLOCK_PX;
        if macroblocks % mb_width != 0 {
            return Err(invalid);
        }
        let grid_width = macroblocks / mb_width;
        let block_size = width / grid_width;
        let grid_height = height / block_size;
        if grid_height == 0 {
            return Err(invalid);
        }
        Ok(Self {
            width_px: width,
            height_px: height,
            grid_width,
            grid_height,
            block_size,
        })
    }

    pub fn block_count(&self) -> usize {
        self.grid_width as usize * self.grid_height as usize
    }
}

/// Block index to top-left pixel coordinate, precomputed once per
/// dimension change and shared read-only by the detection-highlight and
/// mask-edit paths.
pub struct CoordinateCache {
    descriptor: GridDescriptor,
    coords: Vec<(u32, u32)>,
}

impl CoordinateCache {
    /// Row-major walk over the block grid. O(grid_width * grid_height),
    /// never run per frame.
    pub fn build(descriptor: GridDescriptor) -> Self {
        let mut coords = Vec::with_capacity(descriptor.block_count());
        let row_width = descriptor.grid_width * descriptor.block_size;
        let (mut x, mut y) = (0, 0);
        for _ in 0..descriptor.block_count() {
            coords.push((x, y));
            x += descriptor.block_size;
            if x >= row_width {
                x = 0;
                y += descriptor.block_size;
            }
        }
        Self { descriptor, coords }
    }

    pub fn descriptor(&self) -> &GridDescriptor {
        &self.descriptor
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Pixel coordinate of block `index`'s top-left corner.
    pub fn index_to_coord(&self, index: usize) -> Option<(u32, u32)> {
        self.coords.get(index).copied()
    }

    /// Inverse mapping from a canvas-space pixel to a block index.
    pub fn coord_to_index(&self, x: u32, y: u32) -> Option<usize> {
        let col = x / self.descriptor.block_size;
        let row = y / self.descriptor.block_size;
        if col >= self.descriptor.grid_width || row >= self.descriptor.grid_height {
            return None;
        }
        Some((col + row * self.descriptor.grid_width) as usize)
    }
}
