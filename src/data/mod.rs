/// Data layer: core types, loading, cleaning and writing.
///
/// Architecture:
/// ```text
///  .csv / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Trace
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  screen bounds → out-of-range samples become missing
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │   gaps    │  bridge interior gaps → (filled Trace, ValidityMask)
///   └──────────┘
///        │            ... signal::decompose ...
///        ▼
///   ┌──────────┐
///   │   mask    │  restore missing samples, round
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer   │  stage + commit, all-or-nothing per trace
///   └──────────┘
/// ```

pub mod filter;
pub mod gaps;
pub mod loader;
pub mod mask;
pub mod model;
pub mod writer;
