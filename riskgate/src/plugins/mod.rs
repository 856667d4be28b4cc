//! Built-in plugins implementing the lifecycle contract.
//!
//! | slug                    | family               | raw signal                  |
//! |-------------------------|----------------------|-----------------------------|
//! | `volume-check`          | corpus volume        | row count                   |
//! | `isolation-forest`      | decision boundary    | decision function           |
//! | `dense-autoencoder`     | reconstruction error | mean squared error          |
//! | `absolute-autoencoder`  | reconstruction error | mean absolute error         |
//! | `pagerank-centrality`   | centrality           | PageRank × node count       |

pub mod centrality;
pub mod isolation;
pub mod reconstruction;
pub mod registry;
pub mod volume;

pub use centrality::{PageRankConfig, PageRankModel};
pub use isolation::{IsolationForestConfig, IsolationForestModel};
pub use reconstruction::{AutoencoderConfig, AutoencoderModel};
pub use registry::{ModelManifest, ModelRegistry, ParameterKind, ParameterSpec, PluginFactory};
pub use volume::{VolumeCheckConfig, VolumeCheckModel};

use crate::core::{ExecutionContext, IdentityResolver, ResultAssembler, RiskFrame};
use crate::error::Result;
use crate::scoring::{RawSignal, RiskNormalizer};

/// Resolves one identity per signal, normalizes, and assembles the frame.
pub(crate) fn score_rows(
    ctx: &ExecutionContext,
    normalizer: &RiskNormalizer,
    signals: Vec<RawSignal>,
) -> Result<RiskFrame> {
    let identities = IdentityResolver::new().resolve(ctx.dataset(), signals.len())?;
    let mut assembler = ResultAssembler::new();
    assembler.extend(identities, normalizer.normalize_all(signals))?;
    let frame = assembler.finish();

    ctx.log().info(&format!(
        "scored {} rows with the {} profile; {} flagged",
        frame.len(),
        normalizer.profile().family,
        frame.anomalies().count()
    ));
    Ok(frame)
}
