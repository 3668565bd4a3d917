pub mod baseline;
pub mod consts;
pub mod correct;
pub mod error;
pub mod grouping;
pub mod io;
pub mod measurement;
pub mod peak;
pub mod pipeline;
pub mod quality;
pub mod reference;
pub mod stats;
