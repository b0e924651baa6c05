//! Sample data generation for playground examples.

use std::sync::Arc;

use common_error::HelionResult;
use helion_storage::{MemoryStorage, MemoryTable};

/// Create a small collision-event sample.
///
/// The `events` table carries:
/// - `evt`: event number (`Int32`)
/// - `pt`: leading-object transverse momentum (`Float64`)
/// - `eta`: leading-object pseudorapidity (`Float64`)
/// - `charge`: leading-object charge (`Int8`)
/// - `jet_pt`: per-event jet momenta (`Array<Float64>`)
pub fn create_collision_sample() -> HelionResult<Arc<MemoryStorage>> {
    let storage = Arc::new(MemoryStorage::new());

    let n = 256;
    let mut evt = Vec::with_capacity(n);
    let mut pt = Vec::with_capacity(n);
    let mut eta = Vec::with_capacity(n);
    let mut charge = Vec::with_capacity(n);
    let mut jet_pt = Vec::with_capacity(n);

    // Deterministic pseudo-data: good enough to make the demo chains show
    // non-trivial cutflows without pulling in a random-number crate.
    for i in 0..n {
        let x = i as f64;
        evt.push(i as i32);
        pt.push(15.0 + 60.0 * ((x * 0.37).sin().abs()));
        eta.push(2.4 * (x * 0.11).cos());
        charge.push(if i % 3 == 0 { -1 } else { 1 });

        let njets = i % 4;
        jet_pt.push(
            (0..njets)
                .map(|j| 20.0 + 10.0 * j as f64 + (x * 0.07).sin().abs())
                .collect(),
        );
    }

    storage.register_table(
        MemoryTable::builder("events")
            .with_i32("evt", evt)
            .with_f64("pt", pt)
            .with_f64("eta", eta)
            .with_i8("charge", charge)
            .with_f64_lists("jet_pt", jet_pt)
            .build()?,
    )?;

    Ok(storage)
}

/// Create a tiny linear-scan sample (`scan` table, one `Int32` column `x`
/// with rows `0..32`).
pub fn create_scan_sample() -> HelionResult<Arc<MemoryStorage>> {
    let storage = Arc::new(MemoryStorage::new());
    storage.register_table(
        MemoryTable::builder("scan")
            .with_i32("x", (0..32).collect())
            .build()?,
    )?;
    Ok(storage)
}
