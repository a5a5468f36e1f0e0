/// Frequency decomposition of gap-filled traces.
///
/// ```text
///   gap-filled trace
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌─────────┐    ┌──────────┐
///   │ lowpass │    │ highpass │   79-tap Hamming FIR, forward + backward
///   └─────────┘    └──────────┘
///        │              │
///        ▼              ▼
///     signal          noise
/// ```

pub mod decompose;
pub mod fir;
