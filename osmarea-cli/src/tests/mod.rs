//! Shared test harness modules for the `osmarea` CLI.

use super::*;

mod helpers;
