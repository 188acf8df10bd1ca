pub mod grammar;
pub mod response;
pub mod types;

pub use response::{parse_response, ResponseParser, DEFAULT_ACTION_TEXT};
pub use types::{
    AxisOrder, BoxRef, CoordSpace, ModelFamily, ParseMode, ParsedResponse, SpatialReference,
};
