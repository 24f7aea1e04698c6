/// Fixed-size packed `0x00RRGGBB` pixel buffer, row-major from the top-left.
///
/// Allocated zeroed and never resized. The engine overwrites it in place on
/// every render; readers only see it between renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// Pixel at column `x`, row `y`.
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) outside frame");
        self.pixels[(y * self.width + x) as usize]
    }

    /// The raw `width * height * 4` bytes. On little-endian hosts each pixel
    /// reads as B, G, R, X, which is what a `Bgra8Unorm` texture expects.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_frame_is_zeroed() {
        let frame = FrameBuffer::new(4, 3);
        assert_eq!(frame.len(), 12);
        assert!(frame.pixels().iter().all(|&p| p == 0));
        assert_eq!(frame.as_bytes().len(), 4 * 3 * 4);
    }

    #[test]
    fn pixel_indexing_is_row_major() {
        let mut frame = FrameBuffer::new(3, 2);
        frame.pixels_mut()[3 + 2] = 0xABCDEF;
        assert_eq!(frame.pixel(2, 1), 0xABCDEF);
    }

    #[test]
    #[should_panic(expected = "outside frame")]
    fn pixel_out_of_bounds_panics() {
        FrameBuffer::new(2, 2).pixel(2, 0);
    }
}
