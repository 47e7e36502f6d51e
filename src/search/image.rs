//! Image variant: the protected features are the pixels inside a face box
//!
//! An image is a flat [`Instance`] of `height * width * channels` values in
//! `[0, 1]`, laid out row-major with channels innermost. Its similar set
//! replaces the whole box with each configured fill value, so the oracle asks
//! whether occluding the face alone flips the label. Outside the box the
//! search is the tabular one: a single global step along the momentum
//! direction over the most sensitive pixels, then one local step per witness
//! over the least sensitive ones.
//!
//! Face detection is the caller's job; each [`FaceImage`] carries the boxes
//! already found, and only the first one is protected.

use super::gradient::{compute_grad, pick_attribute, sampling_weights, Momentum};
use super::oracle::{find_idi_pair, is_discriminatory};
use super::perturb::{potential_global_x, potential_local_x};
use super::ranking::{sort_biased_features, split_biased_features, FeatureSplit};
use super::report::{ClusterSummary, Phase, RunSummary, SearchReporter};
use crate::data::{Constraint, Domain, Instance, ResultSet};
use crate::model::Classifier;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Dimensions of a flattened image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl ImageShape {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Number of values in the flattened image
    pub fn len(&self) -> usize {
        self.height * self.width * self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat index of one channel value
    pub fn index(&self, row: usize, col: usize, channel: usize) -> usize {
        (row * self.width + col) * self.channels + channel
    }
}

/// Axis-aligned box: `x` is the left column, `y` the top row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl BoundingBox {
    pub fn new(x: usize, y: usize, w: usize, h: usize) -> Self {
        Self { x, y, w, h }
    }

    /// Flat indices of every channel value inside the box, ascending
    ///
    /// The box is cut at the image border. A box with nothing left inside
    /// the image is an error.
    pub fn pixel_indices(&self, shape: &ImageShape) -> Result<Vec<usize>> {
        let rows = self.y..(self.y.saturating_add(self.h)).min(shape.height);
        let cols = self.x..(self.x.saturating_add(self.w)).min(shape.width);
        if rows.is_empty() || cols.is_empty() || shape.channels == 0 {
            return Err(Error::InvalidParameter(format!(
                "bounding box {self:?} does not overlap a {}x{} image",
                shape.height, shape.width
            )));
        }
        let mut indices = Vec::with_capacity(rows.len() * cols.len() * shape.channels);
        for row in rows {
            for col in cols.clone() {
                indices.extend((0..shape.channels).map(|ch| shape.index(row, col, ch)));
            }
        }
        Ok(indices)
    }
}

/// One normalised image and the face boxes detected in it
#[derive(Debug, Clone, PartialEq)]
pub struct FaceImage {
    pub pixels: Instance,
    pub boxes: Vec<BoundingBox>,
}

impl FaceImage {
    pub fn new(pixels: Instance, boxes: Vec<BoundingBox>) -> Self {
        Self { pixels, boxes }
    }
}

/// Tunable parameters of an image search run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageParams {
    pub decay: f32,
    pub global_step: f32,
    pub local_step: f32,
    pub epsilon: f32,
    /// Share of ranked pixels stepped by the global phase
    pub optimal_fraction: f32,
    /// Values the face box is filled with to build the similar set
    pub fills: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ImageParams {
    fn default() -> Self {
        Self {
            decay: 0.5,
            global_step: 0.1,
            local_step: 0.001,
            epsilon: 1e-6,
            optimal_fraction: 0.5,
            fills: vec![0.0, 0.5, 1.0],
            seed: None,
        }
    }
}

impl ImageParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.decay) {
            return Err(Error::InvalidParameter(format!(
                "decay must be in [0, 1), got {}",
                self.decay
            )));
        }
        for (name, value) in [
            ("global_step", self.global_step),
            ("local_step", self.local_step),
            ("epsilon", self.epsilon),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidParameter(format!(
                    "{name} must be finite and > 0, got {value}"
                )));
            }
        }
        if !(self.optimal_fraction > 0.0 && self.optimal_fraction <= 1.0) {
            return Err(Error::InvalidParameter(format!(
                "optimal_fraction must be in (0, 1], got {}",
                self.optimal_fraction
            )));
        }
        if self.fills.is_empty() || self.fills.iter().any(|v| !(0.0..=1.0).contains(v)) {
            return Err(Error::InvalidParameter(format!(
                "fills must be a non-empty list of values in [0, 1], got {:?}",
                self.fills
            )));
        }
        Ok(())
    }
}

/// Search state for one image and its face box
pub struct ImageSearch<'a> {
    model: &'a dyn Classifier,
    constraint: Constraint,
    protected: Vec<usize>,
    fills: &'a [f32],
}

impl<'a> ImageSearch<'a> {
    pub fn new(
        model: &'a dyn Classifier,
        shape: &ImageShape,
        face: &BoundingBox,
        fills: &'a [f32],
    ) -> Result<Self> {
        if model.num_inputs() != shape.len() {
            return Err(Error::ConfigError(format!(
                "model expects {} inputs, image has {} values",
                model.num_inputs(),
                shape.len()
            )));
        }
        Ok(Self {
            model,
            constraint: Constraint::new(vec![Domain::range(0.0, 1.0); shape.len()])?,
            protected: face.pixel_indices(shape)?,
            fills,
        })
    }

    /// Flat indices inside the face box
    pub fn protected(&self) -> &[usize] {
        &self.protected
    }

    /// `img` with the face box filled by each fill value, minus `img` itself
    pub fn similar(&self, img: &Instance) -> Vec<Instance> {
        let mut similar: Vec<Instance> = Vec::with_capacity(self.fills.len());
        for &fill in self.fills {
            let values = vec![fill; self.protected.len()];
            let candidate = img.with_values(&self.protected, &values);
            if candidate != *img && !similar.contains(&candidate) {
                similar.push(candidate);
            }
        }
        similar
    }

    pub fn is_discriminatory(&self, img: &Instance) -> Result<bool> {
        is_discriminatory(img, &self.similar(img), self.model)
    }

    /// Rank pixels outside the box by sensitivity and split them
    pub fn split(&self, img: &Instance, optimal_fraction: f32) -> Result<FeatureSplit> {
        let ranking = sort_biased_features(
            std::slice::from_ref(img),
            self.model,
            &self.protected,
            &self.constraint,
            1,
        )?;
        split_biased_features(&ranking, optimal_fraction)
    }

    /// Single global step from the base image
    ///
    /// The base image is kept when it is already discriminatory. When it has
    /// an idi pair, one candidate per optimal pixel is stepped along the
    /// momentum direction and the discriminatory ones are kept.
    pub fn global_step<R: Rng>(
        &self,
        img: &Instance,
        optimal: &[usize],
        params: &ImageParams,
        rng: &mut R,
    ) -> Result<ResultSet> {
        let mut found = ResultSet::new();
        let similar = self.similar(img);
        if is_discriminatory(img, &similar, self.model)? {
            found.insert(img.clone());
        }
        let Some(pair) = find_idi_pair(img, &similar, self.model, rng)? else {
            return Ok(found);
        };

        let mut momentum = Momentum::new(img.len(), params.decay);
        let direction = momentum.accumulate(
            &compute_grad(img, self.model)?,
            &compute_grad(&pair, self.model)?,
            &self.protected,
        )?;
        for candidate in potential_global_x(img, &direction, optimal, &self.constraint, params.global_step) {
            if self.is_discriminatory(&candidate)? {
                found.insert(candidate);
            }
        }
        Ok(found)
    }

    /// One local step around `witness` over a sampled irrelevant pixel
    pub fn local_step<R: Rng>(
        &self,
        witness: &Instance,
        irrelevant: &[usize],
        params: &ImageParams,
        rng: &mut R,
    ) -> Result<Vec<Instance>> {
        let similar = self.similar(witness);
        let Some(pair) = find_idi_pair(witness, &similar, self.model, rng)? else {
            return Ok(Vec::new());
        };

        let mut momentum = Momentum::new(witness.len(), params.decay);
        let direction = momentum.accumulate(
            &compute_grad(witness, self.model)?,
            &compute_grad(&pair, self.model)?,
            &self.protected,
        )?;
        let weights = sampling_weights(momentum.grad1(), momentum.grad2(), irrelevant, params.epsilon)?;
        let pixel = pick_attribute(irrelevant, &weights, rng)?;

        let mut found = Vec::new();
        for candidate in potential_local_x(
            witness,
            &direction,
            pixel,
            irrelevant,
            &self.constraint,
            params.local_step,
        )? {
            if self.is_discriminatory(&candidate)? {
                found.push(candidate);
            }
        }
        Ok(found)
    }
}

/// What an image run produced
#[derive(Debug, Clone, Default)]
pub struct ImageOutput {
    pub found: ResultSet,
    /// Images that went through both phases
    pub searched: usize,
    /// Images without a face box or dropped after a recoverable error
    pub skipped: usize,
}

/// Generate discriminatory images from every image with a detected face
///
/// Each image is ranked on its own, then gets one global step and one local
/// step per global witness. Reporter events use the image index where the
/// tabular search uses the cluster id. Recoverable errors, and face boxes
/// that miss the image, skip that image only.
pub fn image_idi_generation(
    images: &[FaceImage],
    shape: &ImageShape,
    model: &dyn Classifier,
    params: &ImageParams,
    reporter: &mut dyn SearchReporter,
) -> Result<ImageOutput> {
    let started = Instant::now();
    params.validate()?;
    if let Some((index, image)) = images
        .iter()
        .enumerate()
        .find(|(_, image)| image.pixels.len() != shape.len())
    {
        return Err(Error::ConfigError(format!(
            "image {index} has {} values, shape {shape:?} needs {}",
            image.pixels.len(),
            shape.len()
        )));
    }

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut output = ImageOutput::default();
    for (index, image) in images.iter().enumerate() {
        let Some(face) = image.boxes.first() else {
            output.skipped += 1;
            continue;
        };
        reporter.on_cluster_begin(index, 1);
        match search_image(&image.pixels, shape, face, model, params, &mut rng) {
            Ok((global, local)) => {
                reporter.on_cluster_end(&ClusterSummary {
                    cluster: index,
                    seeds: 1,
                    global_found: global.len(),
                    local_found: local.len(),
                    skipped: 0,
                });
                output.found.union(global);
                output.found.union(local);
                output.searched += 1;
            }
            Err(e) if e.is_recoverable() || matches!(e, Error::InvalidParameter(_)) => {
                reporter.on_skip(Phase::Global, index, &e);
                output.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    reporter.on_run_end(&RunSummary {
        total: output.found.len(),
        clusters_searched: output.searched,
        skipped: output.skipped,
        elapsed: started.elapsed(),
    });
    Ok(output)
}

fn search_image<R: Rng>(
    img: &Instance,
    shape: &ImageShape,
    face: &BoundingBox,
    model: &dyn Classifier,
    params: &ImageParams,
    rng: &mut R,
) -> Result<(ResultSet, ResultSet)> {
    let search = ImageSearch::new(model, shape, face, &params.fills)?;
    let split = search.split(img, params.optimal_fraction)?;
    let global = search.global_step(img, &split.optimal, params, rng)?;

    let mut local = ResultSet::new();
    for witness in &global {
        local.extend(search.local_step(witness, &split.irrelevant, params, rng)?);
    }
    Ok((global, local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dense, Mlp, OutputHead};
    use crate::search::{NoopReporter, RecordingReporter};

    fn inst(values: &[f32]) -> Instance {
        Instance::new(values.to_vec()).unwrap()
    }

    /// 2x2 grey image, pixel (0, 0) is the face
    fn shape() -> ImageShape {
        ImageShape::new(2, 2, 1)
    }

    fn face() -> BoundingBox {
        BoundingBox::new(0, 0, 1, 1)
    }

    /// σ(4·p0 + p1 − 0.5·p2 − 2.5); p3 is dead
    fn face_model() -> Mlp {
        Mlp::new(
            vec![Dense::new(4, 1, vec![4.0, 1.0, -0.5, 0.0], vec![-2.5]).unwrap()],
            OutputHead::Sigmoid,
        )
        .unwrap()
    }

    fn params() -> ImageParams {
        ImageParams {
            fills: vec![0.0, 1.0],
            seed: Some(3),
            ..ImageParams::default()
        }
    }

    #[test]
    fn test_box_indices_cover_every_channel() {
        let shape = ImageShape::new(3, 4, 2);
        let indices = BoundingBox::new(1, 0, 2, 2).pixel_indices(&shape).unwrap();
        assert_eq!(indices, vec![2, 3, 4, 5, 10, 11, 12, 13]);
    }

    #[test]
    fn test_box_is_cut_at_the_border() {
        let shape = ImageShape::new(2, 4, 1);
        let indices = BoundingBox::new(3, 1, 5, 5).pixel_indices(&shape).unwrap();
        assert_eq!(indices, vec![7]);
        assert!(BoundingBox::new(4, 0, 1, 1).pixel_indices(&shape).is_err());
        assert!(BoundingBox::new(0, 0, 0, 1).pixel_indices(&shape).is_err());
    }

    #[test]
    fn test_similar_fills_the_box_only() {
        let model = face_model();
        let search = ImageSearch::new(&model, &shape(), &face(), &[0.0, 0.5, 1.0]).unwrap();
        let img = inst(&[0.5, 0.2, 0.3, 0.4]);
        assert_eq!(
            search.similar(&img),
            vec![inst(&[0.0, 0.2, 0.3, 0.4]), inst(&[1.0, 0.2, 0.3, 0.4])]
        );
    }

    #[test]
    fn test_global_step_follows_gradient_outside_box() {
        let model = face_model();
        let search = ImageSearch::new(&model, &shape(), &face(), &[0.0, 1.0]).unwrap();
        let img = inst(&[0.5; 4]);

        let split = search.split(&img, 0.5).unwrap();
        assert_eq!(split.optimal, vec![1, 2]);
        assert_eq!(split.irrelevant, vec![3]);

        let mut rng = StdRng::seed_from_u64(0);
        let found = search.global_step(&img, &split.optimal, &params(), &mut rng).unwrap();
        assert_eq!(
            found.into_vec(),
            vec![
                img.clone(),
                inst(&[0.5, 0.5 + 0.1, 0.5, 0.5]),
                inst(&[0.5, 0.5, 0.5 - 0.1, 0.5]),
            ]
        );
    }

    #[test]
    fn test_local_step_tries_both_signs_on_flat_pixel() {
        let model = face_model();
        let search = ImageSearch::new(&model, &shape(), &face(), &[0.0, 1.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let found = search.local_step(&inst(&[0.5; 4]), &[3], &params(), &mut rng).unwrap();
        assert_eq!(
            found,
            vec![
                inst(&[0.5, 0.5, 0.5, 0.5 + 0.001]),
                inst(&[0.5, 0.5, 0.5, 0.5 - 0.001]),
            ]
        );
    }

    #[test]
    fn test_generation_merges_both_phases() {
        let model = face_model();
        let images = vec![FaceImage::new(inst(&[0.5; 4]), vec![face()])];
        let mut reporter = RecordingReporter::default();
        let output = image_idi_generation(&images, &shape(), &model, &params(), &mut reporter).unwrap();

        // base + 2 global steps, each with 2 local neighbours on p3
        assert_eq!(output.found.len(), 9);
        assert_eq!(output.searched, 1);
        for img in &output.found {
            assert_eq!(img[0], 0.5, "face pixel moved in {img:?}");
        }
        assert_eq!(reporter.clusters.len(), 1);
        assert_eq!(reporter.clusters[0].global_found, 3);
        assert_eq!(reporter.clusters[0].local_found, 6);
    }

    #[test]
    fn test_face_blind_model_finds_nothing() {
        let blind = Mlp::new(
            vec![Dense::new(4, 1, vec![0.0, 1.0, -0.5, 0.0], vec![-0.2]).unwrap()],
            OutputHead::Sigmoid,
        )
        .unwrap();
        let images = vec![FaceImage::new(inst(&[0.5; 4]), vec![face()])];
        let output = image_idi_generation(&images, &shape(), &blind, &params(), &mut NoopReporter).unwrap();
        assert!(output.found.is_empty());
        assert_eq!(output.searched, 1);
    }

    #[test]
    fn test_images_without_usable_face_are_skipped() {
        let model = face_model();
        let images = vec![
            FaceImage::new(inst(&[0.5; 4]), Vec::new()),
            FaceImage::new(inst(&[0.5; 4]), vec![BoundingBox::new(5, 5, 1, 1)]),
        ];
        let mut reporter = RecordingReporter::default();
        let output = image_idi_generation(&images, &shape(), &model, &params(), &mut reporter).unwrap();
        assert_eq!(output.skipped, 2);
        assert_eq!(output.searched, 0);
        assert_eq!(reporter.skips.len(), 1);
    }

    #[test]
    fn test_image_width_checked_up_front() {
        let model = face_model();
        let images = vec![FaceImage::new(inst(&[0.5; 3]), vec![face()])];
        assert!(matches!(
            image_idi_generation(&images, &shape(), &model, &params(), &mut NoopReporter),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_params_validation() {
        assert!(ImageParams::default().validate().is_ok());
        let no_fills = ImageParams {
            fills: Vec::new(),
            ..ImageParams::default()
        };
        assert!(no_fills.validate().is_err());
        let bright = ImageParams {
            fills: vec![2.0],
            ..ImageParams::default()
        };
        assert!(bright.validate().is_err());
    }
}
