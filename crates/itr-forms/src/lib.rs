//! # itr-forms: Return Form Selection
//!
//! Decides which ITR form a filing belongs on and what each form carries:
//!
//! - [`IncomeProfile`] summarises resolved values by income category.
//! - [`recommend`] finds the simplest eligible form and reports whether the
//!   filing's current form must change.
//! - [`schedules_for`] and [`mandatory_requirements`] describe each form's
//!   schedules and the fields intake cannot complete without.

pub mod recommend;
pub mod schedule;

pub use recommend::{
    ineligibility, recommend, IncomeProfile, Recommendation, ITR1_AGRICULTURAL_CEILING,
    SIMPLE_FORM_INCOME_CEILING, SIMPLE_FORM_MAX_PROPERTIES,
};
pub use schedule::{
    mandatory_requirements, missing_mandatory, permits, schedules_for, MandatoryRequirement,
    ScheduleKind,
};
