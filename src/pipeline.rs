//! Batch orchestration: load, enhance, report.
//!
//! For every identity the [`Pipeline`] asks an [`ImageSource`] for the
//! image, resolves its [`ParameterProfile`], computes the four variants
//! independently from the same original, and hands each result plus one
//! final comparison to a [`Reporter`].
//!
//! ```text
//! ImageSource --RasterBuffer--> Pipeline --Artifact--> Reporter
//!                                  |
//!                     ProfileTable (identity -> profile, final variant)
//! ```
//!
//! Missing images and failed artifact writes are logged and skipped; they
//! never abort the batch.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{LoadError, ReportError, Result};
use crate::filters::{
    equalize_adaptive, equalize_global, gamma_correct, log_transform, unsharp_mask, TileGrid,
};
use crate::profile::{ParameterProfile, ProfileTable};
use crate::raster::RasterBuffer;

/// The four enhancement variants produced per image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    /// Gamma correction or log transform, depending on the profile.
    #[serde(rename = "intensity")]
    Intensity,
    #[serde(rename = "he")]
    GlobalEqualization,
    #[serde(rename = "clahe")]
    Clahe,
    #[serde(rename = "sharpen")]
    Sharpen,
}

impl Variant {
    /// Emission order.
    pub const ALL: [Variant; 4] = [
        Variant::Intensity,
        Variant::GlobalEqualization,
        Variant::Clahe,
        Variant::Sharpen,
    ];

    /// Short name used in artifact file names.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Intensity => "intensity",
            Self::GlobalEqualization => "he",
            Self::Clahe => "clahe",
            Self::Sharpen => "sharpen",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// One processed variant with its human-readable method label.
#[derive(Debug, Clone)]
pub struct Enhanced {
    pub variant: Variant,
    pub label: String,
    pub image: RasterBuffer,
}

/// What an artifact represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Variant(Variant),
    /// The curated before/after pair for an image.
    FinalComparison,
}

/// A before/after pair handed to the reporter.
#[derive(Debug, Clone, Copy)]
pub struct Artifact<'a> {
    pub identity: &'a str,
    pub original: &'a RasterBuffer,
    pub processed: &'a RasterBuffer,
    pub label: &'a str,
    pub kind: ArtifactKind,
}

impl Artifact<'_> {
    /// `<identity>_<slug>` for variants, `<identity>_comparison_final` for
    /// the final comparison.
    pub fn file_stem(&self) -> String {
        match self.kind {
            ArtifactKind::Variant(variant) => format!("{}_{}", self.identity, variant.slug()),
            ArtifactKind::FinalComparison => format!("{}_comparison_final", self.identity),
        }
    }
}

/// Supplies decoded images by identity.
pub trait ImageSource {
    fn load(&mut self, identity: &str) -> Result<RasterBuffer, LoadError>;
}

/// Persists comparison artifacts.
pub trait Reporter {
    fn report(&mut self, artifact: &Artifact<'_>) -> Result<(), ReportError>;
}

/// Totals for a batch that processed at least one image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: Vec<String>,
    pub skipped: Vec<String>,
    pub artifacts_written: usize,
    pub final_comparisons: usize,
    pub failed_artifacts: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// No identity could be loaded.
    NothingToProcess { skipped: Vec<String> },
    Completed(BatchSummary),
}

/// Compute all four variants of one image.
///
/// The variants only read `image`, so they run concurrently; the result is
/// in [`Variant::ALL`] order.
pub fn enhance(
    image: &RasterBuffer,
    profile: &ParameterProfile,
    grid: TileGrid,
) -> Result<Vec<Enhanced>> {
    let ((intensity, equalized), (clahe, sharpened)) = rayon::join(
        || {
            rayon::join(
                || enhance_intensity(image, profile),
                || Enhanced {
                    variant: Variant::GlobalEqualization,
                    label: "Global Histogram Equalization".to_string(),
                    image: equalize_global(image),
                },
            )
        },
        || {
            rayon::join(
                || {
                    equalize_adaptive(image, profile.clahe_clip, grid).map(|out| Enhanced {
                        variant: Variant::Clahe,
                        label: format!("CLAHE (Clip={})", label_number(profile.clahe_clip)),
                        image: out,
                    })
                },
                || {
                    unsharp_mask(image, profile.unsharp_sigma, profile.unsharp_strength).map(
                        |out| Enhanced {
                            variant: Variant::Sharpen,
                            label: format!(
                                "Unsharp Masking (Str={})",
                                label_number(profile.unsharp_strength)
                            ),
                            image: out,
                        },
                    )
                },
            )
        },
    );

    Ok(vec![intensity?, equalized, clahe?, sharpened?])
}

/// Shortest form of a parameter for labels, keeping one decimal on whole
/// numbers: `8.0`, `2.25`.
fn label_number(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn enhance_intensity(image: &RasterBuffer, profile: &ParameterProfile) -> Result<Enhanced> {
    let (label, out) = if profile.use_log {
        ("Log Transform", log_transform(image))
    } else {
        ("Gamma Correction", gamma_correct(image, profile.gamma)?)
    };
    Ok(Enhanced {
        variant: Variant::Intensity,
        label: label.to_string(),
        image: out,
    })
}

/// Drives images from a source through the engines into a reporter.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    table: ProfileTable,
}

impl Pipeline {
    pub fn new(table: ProfileTable) -> Self {
        Self { table }
    }

    /// Enhance one image and report its four variants followed by the final
    /// comparison. Reporter failures are counted, not propagated.
    pub fn process_image<R: Reporter>(
        &self,
        identity: &str,
        original: &RasterBuffer,
        reporter: &mut R,
    ) -> Result<ImageReport> {
        let profile = self.table.resolve_profile(identity);
        let final_variant = self.table.final_variant(identity);
        debug!(identity, ?profile, %final_variant, "Resolved profile");

        let results = enhance(original, &profile, self.table.tile_grid)?;

        let mut report = ImageReport::default();
        for enhanced in &results {
            debug!(identity, variant = %enhanced.variant, label = %enhanced.label, "Variant ready");
            let artifact = Artifact {
                identity,
                original,
                processed: &enhanced.image,
                label: &enhanced.label,
                kind: ArtifactKind::Variant(enhanced.variant),
            };
            report.record(reporter.report(&artifact), &artifact);
        }

        if let Some(chosen) = results.iter().find(|e| e.variant == final_variant) {
            let artifact = Artifact {
                identity,
                original,
                processed: &chosen.image,
                label: &chosen.label,
                kind: ArtifactKind::FinalComparison,
            };
            report.final_written = report.record(reporter.report(&artifact), &artifact);
        }

        Ok(report)
    }

    /// Process every identity in order. Missing or unreadable images are
    /// skipped with a warning.
    pub fn run_batch<S, R, I>(&self, identities: I, source: &mut S, reporter: &mut R) -> BatchOutcome
    where
        S: ImageSource,
        R: Reporter,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut summary = BatchSummary::default();

        for identity in identities {
            let identity = identity.as_ref();
            let image = match source.load(identity) {
                Ok(image) => image,
                Err(e) => {
                    warn!(identity, %e, "Skipping image");
                    summary.skipped.push(identity.to_string());
                    continue;
                }
            };

            info!(
                identity,
                width = image.width(),
                height = image.height(),
                "Processing image"
            );

            match self.process_image(identity, &image, reporter) {
                Ok(report) => {
                    summary.artifacts_written += report.written;
                    summary.failed_artifacts += report.failed;
                    if report.final_written {
                        summary.final_comparisons += 1;
                    }
                    summary.processed.push(identity.to_string());
                }
                Err(e) => {
                    warn!(identity, %e, "Enhancement failed, skipping image");
                    summary.skipped.push(identity.to_string());
                }
            }
        }

        if summary.processed.is_empty() {
            info!("No images found to process");
            return BatchOutcome::NothingToProcess {
                skipped: summary.skipped,
            };
        }

        info!(
            processed = summary.processed.len(),
            skipped = summary.skipped.len(),
            artifacts = summary.artifacts_written,
            "Processing complete"
        );
        BatchOutcome::Completed(summary)
    }
}

/// Per-image artifact counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageReport {
    pub written: usize,
    pub failed: usize,
    pub final_written: bool,
}

impl ImageReport {
    fn record(&mut self, result: Result<(), ReportError>, artifact: &Artifact<'_>) -> bool {
        match result {
            Ok(()) => {
                self.written += 1;
                true
            }
            Err(e) => {
                warn!(identity = artifact.identity, artifact = %artifact.file_stem(), %e, "Failed to write artifact");
                self.failed += 1;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn dark(seed: u8) -> RasterBuffer {
        RasterBuffer::from_fn(24, 16, |x, y| {
            let v = ((x * 3 + y * 5) % 50) as u8 + seed;
            [v, v / 2, v.saturating_add(4)]
        })
    }

    #[derive(Default)]
    struct Recorder {
        stems: Vec<String>,
        labels: Vec<String>,
        fail_on: Option<String>,
    }

    impl Reporter for Recorder {
        fn report(&mut self, artifact: &Artifact<'_>) -> Result<(), ReportError> {
            let stem = artifact.file_stem();
            if self.fail_on.as_deref() == Some(stem.as_str()) {
                return Err(ReportError::Io(std::io::Error::other("disk full")));
            }
            self.stems.push(stem);
            self.labels.push(artifact.label.to_string());
            Ok(())
        }
    }

    struct MapSource(HashMap<String, RasterBuffer>);

    impl ImageSource for MapSource {
        fn load(&mut self, identity: &str) -> Result<RasterBuffer, LoadError> {
            self.0.get(identity).cloned().ok_or_else(|| LoadError::NotFound {
                identity: identity.to_string(),
                path: format!("{identity}.png").into(),
            })
        }
    }

    #[test]
    fn test_enhance_preserves_shape_and_order() {
        let img = dark(3);
        let results = enhance(&img, &ParameterProfile::default(), TileGrid::default()).unwrap();
        let variants: Vec<Variant> = results.iter().map(|e| e.variant).collect();
        assert_eq!(variants, Variant::ALL.to_vec());
        for e in &results {
            assert_eq!(e.image.width(), img.width());
            assert_eq!(e.image.height(), img.height());
            assert_eq!(e.image.channels(), 3);
        }
    }

    #[test]
    fn test_enhance_labels() {
        let img = dark(0);
        let profile = ProfileTable::default().resolve_profile("1");
        let results = enhance(&img, &profile, TileGrid::default()).unwrap();
        let labels: Vec<&str> = results.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Log Transform",
                "Global Histogram Equalization",
                "CLAHE (Clip=8.0)",
                "Unsharp Masking (Str=3.0)",
            ]
        );

        let gamma = enhance(&img, &ParameterProfile::default(), TileGrid::default()).unwrap();
        assert_eq!(gamma[0].label, "Gamma Correction");
    }

    #[test]
    fn test_labels_keep_fractional_parameters() {
        let profile = ParameterProfile {
            clahe_clip: 2.25,
            unsharp_strength: 0.75,
            ..ParameterProfile::default()
        };
        let results = enhance(&dark(0), &profile, TileGrid::default()).unwrap();
        assert_eq!(results[2].label, "CLAHE (Clip=2.25)");
        assert_eq!(results[3].label, "Unsharp Masking (Str=0.75)");

        assert_eq!(label_number(8.0), "8.0");
        assert_eq!(label_number(1.5), "1.5");
    }

    #[test]
    fn test_enhance_matches_engines() {
        let img = dark(7);
        let profile = ParameterProfile::default();
        let results = enhance(&img, &profile, TileGrid::default()).unwrap();
        assert_eq!(results[0].image, gamma_correct(&img, 0.5).unwrap());
        assert_eq!(results[1].image, equalize_global(&img));
        assert_eq!(
            results[2].image,
            equalize_adaptive(&img, 3.0, TileGrid::default()).unwrap()
        );
        assert_eq!(results[3].image, unsharp_mask(&img, 2.0, 1.5).unwrap());
    }

    #[test]
    fn test_enhance_rejects_invalid_profile() {
        let profile = ParameterProfile {
            gamma: 0.0,
            ..ParameterProfile::default()
        };
        assert!(enhance(&dark(0), &profile, TileGrid::default()).is_err());
    }

    #[test]
    fn test_process_image_emits_variants_then_final() {
        let pipeline = Pipeline::default();
        let mut reporter = Recorder::default();
        let report = pipeline.process_image("2", &dark(1), &mut reporter).unwrap();

        assert_eq!(
            reporter.stems,
            vec!["2_intensity", "2_he", "2_clahe", "2_sharpen", "2_comparison_final"]
        );
        // Identity 2 curates CLAHE as its final comparison
        assert_eq!(reporter.labels[4], "CLAHE (Clip=3.0)");
        assert_eq!(report.written, 5);
        assert!(report.final_written);
    }

    #[test]
    fn test_final_comparison_defaults_to_intensity() {
        let pipeline = Pipeline::default();
        let mut reporter = Recorder::default();
        pipeline.process_image("3", &dark(1), &mut reporter).unwrap();
        assert_eq!(reporter.labels[4], "Log Transform");
    }

    #[test]
    fn test_batch_skips_missing() {
        let source = HashMap::from([("1".to_string(), dark(2)), ("2".to_string(), dark(5))]);
        let mut source = MapSource(source);
        let mut reporter = Recorder::default();

        let outcome = Pipeline::default().run_batch(["1", "2", "3", "4"], &mut source, &mut reporter);

        let BatchOutcome::Completed(summary) = outcome else {
            panic!("expected a completed batch");
        };
        assert_eq!(summary.processed, vec!["1", "2"]);
        assert_eq!(summary.skipped, vec!["3", "4"]);
        assert_eq!(summary.final_comparisons, 2);
        assert_eq!(summary.artifacts_written, 10);
        let finals = reporter
            .stems
            .iter()
            .filter(|s| s.ends_with("_comparison_final"))
            .count();
        assert_eq!(finals, 2);
    }

    #[test]
    fn test_batch_nothing_to_process() {
        let mut source = MapSource(HashMap::new());
        let mut reporter = Recorder::default();
        let outcome = Pipeline::default().run_batch(["1", "2"], &mut source, &mut reporter);
        assert_eq!(
            outcome,
            BatchOutcome::NothingToProcess {
                skipped: vec!["1".to_string(), "2".to_string()]
            }
        );
        assert!(reporter.stems.is_empty());
    }

    #[test]
    fn test_report_failure_does_not_abort() {
        let source = HashMap::from([("1".to_string(), dark(2)), ("4".to_string(), dark(9))]);
        let mut source = MapSource(source);
        let mut reporter = Recorder {
            fail_on: Some("1_he".to_string()),
            ..Default::default()
        };

        let outcome = Pipeline::default().run_batch(["1", "4"], &mut source, &mut reporter);
        let BatchOutcome::Completed(summary) = outcome else {
            panic!("expected a completed batch");
        };
        assert_eq!(summary.processed.len(), 2);
        assert_eq!(summary.failed_artifacts, 1);
        assert_eq!(summary.artifacts_written, 9);
        assert_eq!(summary.final_comparisons, 2);
    }
}
