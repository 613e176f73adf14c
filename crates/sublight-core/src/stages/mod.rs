//! Pipeline stages.
//!
//! Each stage is a stateless unit implementing [`Stage`]; its parameters and
//! flags live in the [`PipelineConfig`] passed to every call. The engine owns
//! the fixed execution order.

mod beer_lambert;
mod clahe;
mod color_rebalance;
mod fusion;
mod udcp;
mod white_balance;

#[cfg(test)]
mod tests;

pub(crate) use udcp::dark_channel as udcp_dark_channel;

pub use beer_lambert::BeerLambertStage;
pub use clahe::ClaheStage;
pub use color_rebalance::ColorRebalanceStage;
pub use fusion::FusionStage;
pub use udcp::UdcpStage;
pub use white_balance::WhiteBalanceStage;

use crate::cancel::CancelToken;
use crate::config::{PipelineConfig, StageId};
use crate::error::Result;
use crate::image::Image;
use crate::models::SceneSignature;

/// Contract shared by all pipeline stages.
///
/// `apply` must preserve image dimensions and return samples in `[0, 1]`.
/// `auto_tune` derives parameters from the shared scene signature and writes
/// them into the configuration; it never inspects pipeline output.
pub trait Stage: Send + Sync {
    fn id(&self) -> StageId;

    fn apply(&self, image: &Image, config: &PipelineConfig, cancel: &CancelToken)
        -> Result<Image>;

    fn auto_tune(&self, signature: &SceneSignature, config: &mut PipelineConfig) -> Result<()>;

    /// Human-readable summary of the stage with its active parameters.
    fn describe(&self, config: &PipelineConfig) -> String;
}

/// Stage implementation for an identifier.
pub fn stage_for(id: StageId) -> &'static dyn Stage {
    match id {
        StageId::WhiteBalance => &WhiteBalanceStage,
        StageId::Udcp => &UdcpStage,
        StageId::BeerLambert => &BeerLambertStage,
        StageId::ColorRebalance => &ColorRebalanceStage,
        StageId::Clahe => &ClaheStage,
        StageId::MultiscaleFusion => &FusionStage,
    }
}
