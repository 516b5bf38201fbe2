mod helpers;
mod ingredients;
mod recipe;
mod report;
mod swap;

pub(crate) use ingredients::cmd_ingredients;
pub(crate) use recipe::{cmd_add, cmd_evaluate, cmd_import, cmd_remove, cmd_reset, cmd_show};
pub(crate) use report::{cmd_equivalences, cmd_finalize, cmd_project};
pub(crate) use swap::{cmd_eligible, cmd_suggest, cmd_swap};
