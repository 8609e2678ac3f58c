use std::future::Future;

use cccb_assist::{AssistError, HttpDataSource};
use cccb_types::{ArticulationObj, RequirementGroup, RequirementInputs};

/// Where a session loads its catalog and agreements from.
pub trait DataSource {
    fn requirements(
        &self,
        inputs: &RequirementInputs,
    ) -> impl Future<Output = Result<RequirementGroup, AssistError>> + Send;

    fn articulations(
        &self,
        inputs: &[RequirementInputs],
    ) -> impl Future<Output = Result<Vec<ArticulationObj>, AssistError>> + Send;

    /// Secondary dataset used to link search hits. `Ok(None)` when there is
    /// none.
    fn equivalence(
        &self,
        inputs: &[RequirementInputs],
    ) -> impl Future<Output = Result<Option<Vec<ArticulationObj>>, AssistError>> + Send;
}

impl DataSource for HttpDataSource {
    fn requirements(
        &self,
        inputs: &RequirementInputs,
    ) -> impl Future<Output = Result<RequirementGroup, AssistError>> + Send {
        self.fetch_requirements(inputs)
    }

    fn articulations(
        &self,
        inputs: &[RequirementInputs],
    ) -> impl Future<Output = Result<Vec<ArticulationObj>, AssistError>> + Send {
        self.fetch_articulations(inputs)
    }

    fn equivalence(
        &self,
        inputs: &[RequirementInputs],
    ) -> impl Future<Output = Result<Option<Vec<ArticulationObj>>, AssistError>> + Send {
        self.fetch_equivalence(inputs)
    }
}
