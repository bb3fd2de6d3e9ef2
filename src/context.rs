//! Per-run generation context.
//!
//! A [`GeneratorContext`] is built at the start of every
//! [`Generator::generate`](crate::generate::Generator::generate) call and
//! dropped when the run ends. It is the only mutable state of a run (through
//! the interior mutability of its [`BuildCache`]) and is shared by reference
//! with every worker.

use crate::blocks::BlockCatalog;
use crate::cache::BuildCache;
use crate::config::GeneratorConfig;
use chrono::{Datelike, NaiveDate};

pub struct GeneratorContext<'a> {
    pub config: &'a GeneratorConfig,
    pub catalog: &'a BlockCatalog,
    pub cache: BuildCache,
    /// Fixed once per run. Drives the footer year and the sitemap fallback.
    pub build_date: NaiveDate,
}

impl<'a> GeneratorContext<'a> {
    pub fn new(
        config: &'a GeneratorConfig,
        catalog: &'a BlockCatalog,
        cache: bool,
        build_date: NaiveDate,
    ) -> Self {
        Self {
            config,
            catalog,
            cache: BuildCache::new(cache),
            build_date,
        }
    }

    pub fn year(&self) -> i32 {
        self.build_date.year()
    }
}
