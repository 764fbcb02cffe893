//! Separable gaussian blur over premultiplied surfaces, fixed-point Q16 so
//! results are identical across platforms. The glow brush runs this on its
//! scratch layer before compositing.

use super::surface::Surface;

/// Blur `surface` in place. A radius of zero is the identity. Sigma is tied
/// to the radius so callers specify blur strength with one number, the way a
/// canvas `blur(px)` filter does.
pub fn blur_surface(surface: &mut Surface, radius_px: f64) {
    let radius = radius_px.round().max(0.0) as u32;
    if radius == 0 || surface.width() == 0 || surface.height() == 0 {
        return;
    }
    let sigma = (radius_px / 2.0).max(0.5);
    let kernel = gaussian_kernel_q16(radius, sigma);
    let (w, h) = (surface.width(), surface.height());
    let mut tmp = vec![0u8; surface.data().len()];
    horizontal_pass(surface.data(), &mut tmp, w, h, &kernel);
    vertical_pass(&tmp, surface.data_mut(), w, h, &kernel);
}

fn gaussian_kernel_q16(radius: u32, sigma: f64) -> Vec<u32> {
    let r = radius as i32;
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-r..=r).map(|i| (-(i * i) as f64 / denom).exp()).collect();
    let sum: f64 = weights_f.iter().sum();

    // Normalize into Q16, then force the total to exactly 1<<16 so constant
    // regions stay constant.
    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|&wf| (((wf / sum) * 65536.0).round() as i64).clamp(0, 65536) as u32)
        .collect();
    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    weights
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                let idx = ((y * w + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y + ki as i32 - radius).clamp(0, h - 1);
                let idx = ((sy * w + x) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}
