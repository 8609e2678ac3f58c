//! Plan logic for CCCBuilder.
//!
//! Everything here is synchronous and pure: articulation lookup, the greedy
//! plan builder, minimization, requirement evaluation, and resolving search
//! hits back onto an articulation dataset. The engine crate owns state and IO
//! and calls into these functions after every mutation.

mod builder;
mod catalog;
mod directory;
mod evaluate;
mod hits;
mod index;
mod minimize;
mod resolve;

pub use builder::{BuildReport, PlanBuilder, build_plan, update_plan_courses};
pub use catalog::{create_instructions, group_by_university, natural_cmp, remove_duplicates, sort_courses};
pub use directory::{Institution, InstitutionDirectory, match_name};
pub use evaluate::{Evaluator, GroupStatus, requirement_completed};
pub use hits::{CollegeHits, group_search_hits};
pub use index::{ArticulationIndex, ArticulationMatch, find_articulation, option_in_plan};
pub use minimize::minimize_courses;
pub use resolve::{Equivalence, course_matches, find_equivalent};
