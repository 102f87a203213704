// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device and PPD enumeration collaborators.
//!
//! get-devices and get-ppds are answered by an external subsystem; the
//! scheduler only relays whatever attribute groups it returns. The
//! default lookup knows nothing.

use pq_core::AttrBag;

/// Enumerates attachable devices and installable PPDs.
pub trait DeviceLookup: Send + Sync {
    fn devices(&self) -> Vec<AttrBag>;
    fn ppds(&self) -> Vec<AttrBag>;
}

/// Lookup with no probes configured.
#[derive(Default)]
pub struct EmptyLookup;

impl DeviceLookup for EmptyLookup {
    fn devices(&self) -> Vec<AttrBag> {
        Vec::new()
    }

    fn ppds(&self) -> Vec<AttrBag> {
        Vec::new()
    }
}
