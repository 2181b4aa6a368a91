use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, ImageFormat, RgbImage};
use shared::Predictions;

/// Pair labels with scores and order by descending probability. The sort is
/// stable, so equal scores keep label order.
pub fn rank(labels: &[&str], scores: &[f32]) -> Predictions {
    let mut entries: Vec<(String, f32)> = labels
        .iter()
        .zip(scores)
        .map(|(label, score)| (label.to_string(), *score))
        .collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));
    Predictions::new(entries)
}

/// Index and value of the highest score; the first one wins on ties.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (idx, score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((idx, score)),
        })
}

pub fn encode_jpeg_base64(image: &RgbImage) -> Result<String, image::ImageError> {
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(image.clone()).write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)?;
    Ok(general_purpose::STANDARD.encode(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_sorts_descending() {
        let ranked = rank(&["a", "b", "c", "d"], &[0.1, 0.7, 0.3, 0.9]);
        let labels: Vec<&str> = ranked.iter().map(|(l, _)| l).collect();
        assert_eq!(labels, ["d", "b", "c", "a"]);
        assert!(ranked.entries().windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn rank_ties_keep_label_order() {
        let ranked = rank(&["Mass", "Nodule", "Edema", "Hernia"], &[0.5, 0.8, 0.5, 0.5]);
        let labels: Vec<&str> = ranked.iter().map(|(l, _)| l).collect();
        assert_eq!(labels, ["Nodule", "Mass", "Edema", "Hernia"]);
    }

    #[test]
    fn argmax_picks_first_maximum() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), Some((1, 0.4)));
        assert_eq!(argmax(&[0.9, 0.05, 0.05]), Some((0, 0.9)));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn jpeg_round_trips_through_base64() {
        let image = RgbImage::from_pixel(16, 16, image::Rgb([120, 30, 200]));
        let encoded = encode_jpeg_base64(&image).unwrap();
        let bytes = general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        assert_eq!(image::load_from_memory(&bytes).unwrap().width(), 16);
    }
}
