//! Data models: per-stage parameter records, scene statistics, and reports.

mod descriptor;
mod params;
mod quality;
mod signature;

pub use descriptor::{ParamDescriptor, ParamKind, ParameterValue};
pub use params::{
    BeerLambertParams, ClaheParams, ColorRebalanceParams, FusionParams, UdcpParams, WbMethod,
    WhiteBalanceParams,
};
pub use quality::{QualityCheck, QualityReport};
pub use signature::{SceneSignature, WaterTypeTag, SIGNATURE_PERCENTILES};
