/// Data layer: core types, locale codec, loading, and column ordering.
///
/// Architecture:
/// ```text
///  .csv exports / cpu history .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset / HostSeries
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  header order, HostRecord per row
///   └──────────┘
///        │           codec: "12,50" ⇄ 12.5
///        ▼
///   ┌──────────┐
///   │  schema   │  splice derived columns into the header
///   └──────────┘
/// ```

pub mod codec;
pub mod loader;
pub mod model;
pub mod schema;
