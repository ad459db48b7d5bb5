/// Data layer: core types, input discovery, and table I/O.
///
/// Architecture:
/// ```text
///  dataset/<id>.wav + dataset/<id>.txt
///        │
///        ▼
///   ┌──────────┐
///   │  source   │  pair files, decode wav, parse intervals
///   └──────────┘
///        │
///        ▼   (signal + assembler)
///   ┌──────────┐
///   │  Dataset  │  insertion-ordered DatasetRecord, keyed by id
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer   │  Dataset → .parquet / .json
///   └──────────┘
///        ▲
///   ┌──────────┐
///   │  loader   │  .parquet / .json → Dataset (resume, inspection)
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod source;
pub mod writer;
