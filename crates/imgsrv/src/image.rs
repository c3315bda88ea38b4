//! In-memory image representation and the pure transform operations.
//!
//! Per `spec.md` §1 these are an external collaborator — "treated as pure
//! functions from image to image" — so the pixel math here is deliberately
//! simple. What matters for the server is that each function is total and
//! side-effect free.

/// A row-major, interleaved-channel raster image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub pixels: Vec<u8>,
}

impl Image {
    pub fn new(width: u32, height: u32, channels: u8, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            width as usize * height as usize * channels as usize,
            "pixel buffer length does not match width*height*channels"
        );
        Self {
            width,
            height,
            channels,
            pixels,
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32, c: u8) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels as usize + c as usize
    }

    #[inline]
    fn get(&self, x: u32, y: u32, c: u8) -> u8 {
        self.pixels[self.index(x, y, c)]
    }
}

/// Rotates the image 90 degrees clockwise.
pub fn rotate90_cw(img: &Image) -> Image {
    let (w, h, ch) = (img.width, img.height, img.channels);
    let mut out = vec![0u8; img.pixels.len()];
    let new_w = h;
    for y in 0..h {
        for x in 0..w {
            let nx = h - 1 - y;
            let ny = x;
            for c in 0..ch {
                let src = img.get(x, y, c);
                let dst = (ny as usize * new_w as usize + nx as usize) * ch as usize + c as usize;
                out[dst] = src;
            }
        }
    }
    Image::new(h, w, ch, out)
}

/// A 3x3 box blur, clamped at the borders.
pub fn blur(img: &Image) -> Image {
    convolve3x3(img, &[[1.0; 3]; 3], 9.0)
}

/// A simple sharpening kernel.
pub fn sharpen(img: &Image) -> Image {
    let kernel = [[0.0, -1.0, 0.0], [-1.0, 5.0, -1.0], [0.0, -1.0, 0.0]];
    convolve3x3(img, &kernel, 1.0)
}

/// Vertical (Sobel-Gx) edge response.
pub fn vertical_edges(img: &Image) -> Image {
    let kernel = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
    convolve3x3(img, &kernel, 1.0)
}

/// Horizontal (Sobel-Gy) edge response.
pub fn horizontal_edges(img: &Image) -> Image {
    let kernel = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];
    convolve3x3(img, &kernel, 1.0)
}

fn convolve3x3(img: &Image, kernel: &[[f32; 3]; 3], divisor: f32) -> Image {
    let (w, h, ch) = (img.width, img.height, img.channels);
    let mut out = vec![0u8; img.pixels.len()];
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            for c in 0..ch {
                let mut acc = 0.0f32;
                for (ky, row) in kernel.iter().enumerate() {
                    for (kx, weight) in row.iter().enumerate() {
                        let sx = (x + kx as i64 - 1).clamp(0, w as i64 - 1) as u32;
                        let sy = (y + ky as i64 - 1).clamp(0, h as i64 - 1) as u32;
                        acc += *weight * f32::from(img.get(sx, sy, c));
                    }
                }
                let value = (acc / divisor).clamp(0.0, 255.0) as u8;
                let dst = (y as usize * w as usize + x as usize) * ch as usize + c as usize;
                out[dst] = value;
            }
        }
    }
    Image::new(w, h, ch, out)
}
