//! One student's transfer-planning session.
//!
//! A session owns the datasets fetched for its selections, the plan built
//! from them, the courses the student chose to skip and the state of every
//! per-course search. Every mutation re-runs the builder to quiescence.

use futures_util::future::try_join_all;

use cccb_assist::{SearchHandle, SearchOutcome, SearchRequest, SearchRunner};
use cccb_core::{
    ArticulationIndex, BuildReport, CollegeHits, Evaluator, InstitutionDirectory, PlanBuilder, create_instructions,
    find_equivalent, update_plan_courses,
};
use cccb_types::{
    ArticulationObj, CompositeCourseId, Course, CourseKey, Exclusions, FoundCourse, PlanCourse, RequirementGroup,
    RequirementInputs, SearchTarget,
};

use crate::error::SessionError;
use crate::source::DataSource;
use crate::tracker::{SearchPhase, SearchState, SearchTracker};

/// A university and major the student is transferring into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub fy_id: String,
    pub major_id: String,
}

impl Selection {
    #[must_use]
    pub fn new(fy_id: impl Into<String>, major_id: impl Into<String>) -> Self {
        Self {
            fy_id: fy_id.into(),
            major_id: major_id.into(),
        }
    }

    /// Parse `"<fyId>:<majorId>"`. The major id may itself contain `/`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (fy_id, major_id) = raw.split_once(':')?;
        let (fy_id, major_id) = (fy_id.trim(), major_id.trim());
        if fy_id.is_empty() || major_id.is_empty() {
            return None;
        }
        Some(Self::new(fy_id, major_id))
    }

    fn inputs(&self, ccc_id: &str, yr: &str) -> RequirementInputs {
        RequirementInputs {
            ccc_id: ccc_id.to_string(),
            fy_id: self.fy_id.clone(),
            yr: yr.to_string(),
            major_id: self.major_id.clone(),
        }
    }
}

/// Completion of one requirement within a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementStatus {
    pub inputs: RequirementInputs,
    /// Position of the requirement within its group.
    pub index: usize,
    pub instructions: String,
    pub completed: bool,
}

/// Result of trying to tie a search hit back into the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adoption {
    Linked { added: usize },
    /// Neither dataset knows the hit; it stays a plain search result.
    Unlinked,
}

#[derive(Debug)]
pub struct Session {
    ccc_id: String,
    yr: String,
    requirements: Vec<RequirementGroup>,
    agreements: Vec<ArticulationObj>,
    plan: Vec<PlanCourse>,
    exclusions: Exclusions,
    searches: SearchTracker,
}

impl Session {
    /// Fetch every selection's requirements and the articulation dataset,
    /// then build the initial plan. Any failed fetch fails the whole open.
    pub async fn open<S: DataSource>(
        source: &S,
        ccc_id: &str,
        yr: &str,
        selections: &[Selection],
    ) -> Result<Self, SessionError> {
        if selections.is_empty() {
            return Err(SessionError::NoSelections);
        }
        let inputs: Vec<RequirementInputs> = selections.iter().map(|s| s.inputs(ccc_id, yr)).collect();

        let requirements = try_join_all(inputs.iter().map(|i| source.requirements(i)))
            .await
            .map_err(|source| SessionError::Fetch {
                what: "requirements",
                source,
            })?;
        let agreements = source
            .articulations(&inputs)
            .await
            .map_err(|source| SessionError::Fetch {
                what: "articulations",
                source,
            })?;

        let session = Self::from_parts(ccc_id, yr, requirements, agreements);
        tracing::info!(
            ccc_id,
            selections = selections.len(),
            agreements = session.agreements.len(),
            plan_len = session.plan.len(),
            "Session opened"
        );
        Ok(session)
    }

    /// Build a session from datasets that are already loaded.
    #[must_use]
    pub fn from_parts(
        ccc_id: impl Into<String>,
        yr: impl Into<String>,
        requirements: Vec<RequirementGroup>,
        agreements: Vec<ArticulationObj>,
    ) -> Self {
        let mut session = Self {
            ccc_id: ccc_id.into(),
            yr: yr.into(),
            requirements,
            agreements,
            plan: Vec::new(),
            exclusions: Exclusions::new(),
            searches: SearchTracker::new(),
        };
        session.rebuild();
        session
    }

    pub fn rebuild(&mut self) -> BuildReport {
        PlanBuilder::new(&self.agreements).build(&self.requirements, &mut self.plan)
    }

    #[must_use]
    pub fn ccc_id(&self) -> &str {
        &self.ccc_id
    }

    #[must_use]
    pub fn yr(&self) -> &str {
        &self.yr
    }

    #[must_use]
    pub fn requirements(&self) -> &[RequirementGroup] {
        &self.requirements
    }

    #[must_use]
    pub fn agreements(&self) -> &[ArticulationObj] {
        &self.agreements
    }

    #[must_use]
    pub fn plan(&self) -> &[PlanCourse] {
        &self.plan
    }

    #[must_use]
    pub fn exclusions(&self) -> &Exclusions {
        &self.exclusions
    }

    #[must_use]
    pub fn searches(&self) -> &SearchTracker {
        &self.searches
    }

    /// Every selection's inputs, addressed to `ccc_id` instead of the
    /// session's own college.
    fn inputs_for_college(&self, ccc_id: &str) -> Vec<RequirementInputs> {
        self.requirements
            .iter()
            .map(|g| RequirementInputs {
                ccc_id: ccc_id.to_string(),
                ..g.inputs.clone()
            })
            .collect()
    }

    #[must_use]
    pub fn statuses(&self) -> Vec<RequirementStatus> {
        let evaluator = Evaluator::new(&self.agreements, &self.plan, &self.exclusions);
        self.requirements
            .iter()
            .flat_map(|group| {
                let evaluator = &evaluator;
                group.requirements.iter().enumerate().map(move |(index, requirement)| RequirementStatus {
                    inputs: group.inputs.clone(),
                    index,
                    instructions: create_instructions(&requirement.required_courses),
                    completed: evaluator.requirement_completed(requirement, Some(&group.inputs)),
                })
            })
            .collect()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.statuses().iter().all(|s| s.completed)
    }

    /// FY courses that nothing in the plan satisfies yet, first occurrence
    /// only. These are the candidates for a manual pick or a search.
    #[must_use]
    pub fn unresolved_courses(&self) -> Vec<(RequirementInputs, Course)> {
        let evaluator = Evaluator::new(&self.agreements, &self.plan, &self.exclusions);
        let mut seen: Vec<CourseKey> = Vec::new();
        let mut out = Vec::new();
        for group in &self.requirements {
            for requirement in &group.requirements {
                for course in requirement.required_courses.iter().flat_map(|g| &g.courses) {
                    let key = course.key();
                    if seen.contains(&key) || evaluator.course_satisfied(course, Some(&group.inputs)) {
                        continue;
                    }
                    seen.push(key);
                    out.push((group.inputs.clone(), course.clone()));
                }
            }
        }
        out
    }

    /// Adopt articulation option `index` for `fy_course`.
    pub fn select_option(
        &mut self,
        fy_course: &Course,
        inputs: &RequirementInputs,
        index: usize,
    ) -> Result<BuildReport, SessionError> {
        let lookup = ArticulationIndex::new(&self.agreements);
        let found = lookup
            .find_scoped(fy_course, Some(inputs))
            .ok_or_else(|| SessionError::NoArticulation(fy_course.key()))?;
        let option = found.options().get(index).ok_or_else(|| SessionError::NoSuchOption {
            key: fy_course.key(),
            index,
        })?;
        let added = update_plan_courses(&mut self.plan, option, found.agreement, found.fy_course());
        tracing::info!(fy_course = %fy_course.key(), index, added, "Articulation option selected");
        Ok(self.rebuild())
    }

    /// Put a sending course in the plan without tying it to a requirement.
    pub fn add_course(&mut self, course: Course) -> BuildReport {
        let key = course.key();
        if !self.plan.iter().any(|pc| pc.key() == key) {
            self.plan.push(PlanCourse::new(course, None));
        }
        self.rebuild()
    }

    /// Skip `fy_course`. Returns `false` if it was already skipped.
    pub fn exclude(&mut self, fy_course: Course) -> bool {
        let key = fy_course.key();
        let inserted = self.exclusions.insert(fy_course);
        if inserted {
            tracing::info!(fy_course = %key, "Course excluded");
            self.rebuild();
        }
        inserted
    }

    /// Address of `fy_course` for the search subsystem. Plain ids get the
    /// session's year appended.
    pub fn search_target(&self, fy_course: &Course, inputs: &RequirementInputs) -> Result<SearchTarget, SessionError> {
        let raw = fy_course.raw_id();
        let course_id = match CompositeCourseId::parse(raw) {
            Ok(_) => raw.to_string(),
            Err(_) => CompositeCourseId::new(raw.trim(), self.yr.as_str()).to_string(),
        };
        Ok(SearchTarget::parse(&course_id, &inputs.major_id, Some(&inputs.fy_id))?)
    }

    /// Start a background search for `fy_course`. Only an idle course can
    /// be searched.
    pub fn start_search(
        &mut self,
        runner: &SearchRunner,
        fy_course: &Course,
        inputs: &RequirementInputs,
    ) -> Result<SearchHandle, SessionError> {
        let key = fy_course.key();
        self.searches.ensure_idle(&key)?;
        let target = self.search_target(fy_course, inputs)?;
        let handle = runner.spawn(SearchRequest {
            target,
            primary_ccc_id: self.ccc_id.clone(),
        });
        self.searches.begin(key, handle.abort_handle())?;
        Ok(handle)
    }

    /// Record how a search started with [`start_search`](Self::start_search) ended.
    pub fn finish_search(&mut self, fy_course: &Course, outcome: &SearchOutcome) -> SearchPhase {
        let key = fy_course.key();
        match outcome {
            SearchOutcome::Completed(report) => self.searches.complete(&key, report),
            SearchOutcome::Cancelled => {
                self.searches.cancel(&key);
                self.searches.phase(&key)
            }
            SearchOutcome::Failed(e) => {
                tracing::warn!(fy_course = %key, %e, "Search failed");
                self.searches.fail(&key, e.to_string());
                self.searches.phase(&key)
            }
        }
    }

    pub fn cancel_search(&mut self, fy_course: &Course) -> bool {
        self.searches.cancel(&fy_course.key())
    }

    /// Return a finished search to idle so it can be run again.
    pub fn reset_search(&mut self, fy_course: &Course) -> bool {
        self.searches.reset(&fy_course.key())
    }

    #[must_use]
    pub fn search_hits(&self, fy_course: &Course) -> Option<&[CollegeHits]> {
        match self.searches.state(&fy_course.key()) {
            Some(SearchState::Found { hits, .. }) => Some(hits),
            _ => None,
        }
    }

    /// Try to merge `option`, one of the courses (or series) `hit` reports,
    /// into the plan as satisfying `fy_course`.
    ///
    /// The loaded dataset is checked first. Otherwise the hit's college is
    /// looked up in `colleges` and the equivalence dataset is fetched for
    /// that college. A failed lookup or fetch is logged and leaves the hit
    /// unlinked.
    pub async fn link_search_hit<S: DataSource>(
        &mut self,
        source: &S,
        colleges: &InstitutionDirectory,
        fy_course: &Course,
        hit: &CollegeHits,
        option: &[FoundCourse],
    ) -> Adoption {
        let key = fy_course.key();
        let added = if let Some(eq) = find_equivalent(option, &self.agreements) {
            Some(update_plan_courses(&mut self.plan, eq.option, eq.agreement, fy_course))
        } else {
            let dataset = self.fetch_equivalence(source, colleges, hit, &key).await;
            dataset.and_then(|dataset| {
                find_equivalent(option, &dataset)
                    .map(|eq| update_plan_courses(&mut self.plan, eq.option, eq.agreement, fy_course))
            })
        };

        match added {
            Some(added) => {
                self.searches.mark_linked(&key);
                self.rebuild();
                tracing::info!(fy_course = %key, added, "Search hit linked");
                Adoption::Linked { added }
            }
            None => {
                tracing::info!(
                    fy_course = %key,
                    college = ?hit.college_name,
                    found = ?option.iter().map(FoundCourse::label).collect::<Vec<_>>(),
                    "Search hit has no equivalent articulation"
                );
                Adoption::Unlinked
            }
        }
    }

    async fn fetch_equivalence<S: DataSource>(
        &self,
        source: &S,
        colleges: &InstitutionDirectory,
        hit: &CollegeHits,
        key: &CourseKey,
    ) -> Option<Vec<ArticulationObj>> {
        let Some(college) = hit.college_name.as_deref().and_then(|name| colleges.resolve_name(name)) else {
            tracing::warn!(fy_course = %key, college = ?hit.college_name, "Search hit college is not a known institution");
            return None;
        };
        match source.equivalence(&self.inputs_for_college(&college.id)).await {
            Ok(dataset) => dataset,
            Err(e) => {
                tracing::warn!(fy_course = %key, ccc_id = %college.id, %e, "Equivalence lookup failed");
                None
            }
        }
    }

    /// Abort every running search. Called when the session is torn down.
    pub fn shutdown(&mut self) {
        self.searches.abort_all();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.searches.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use cccb_assist::AssistError;
    use cccb_core::Institution;
    use cccb_types::{
        Articulation, ArticulationInfo, CourseGroup, GroupRule, InstitutionInfo, Requirement,
    };

    use super::*;

    fn cc(id: &str, prefix: &str, number: &str, title: &str) -> Course {
        Course::course(id, prefix, number, title)
    }

    fn fy(id: &str, number: &str) -> Course {
        Course::course(id, "COMPSCI", number, format!("CS {number}"))
    }

    fn agreement(ccc_id: &str, fy_id: &str, major_id: &str, articulations: Vec<Articulation>) -> ArticulationObj {
        ArticulationObj {
            ccc_info: InstitutionInfo {
                code: None,
                id: Some(ccc_id.to_string()),
                name: format!("College {ccc_id}"),
            },
            university_info: InstitutionInfo {
                code: None,
                id: Some(fy_id.to_string()),
                name: format!("University {fy_id}"),
            },
            articulation_info: ArticulationInfo {
                major: "Computer Science".to_string(),
                major_id: Some(major_id.to_string()),
                ..ArticulationInfo::default()
            },
            articulated_courses: articulations,
            non_articulated_courses: Vec::new(),
        }
    }

    #[derive(Default)]
    struct MemorySource {
        requirements: HashMap<(String, String), Vec<Requirement>>,
        articulations: Vec<ArticulationObj>,
        equivalence: Option<Vec<ArticulationObj>>,
        fail_articulations: bool,
        fail_equivalence: bool,
        /// `cccId` of every equivalence request, in order.
        equivalence_colleges: Mutex<Vec<String>>,
    }

    fn status_error() -> AssistError {
        AssistError::Task("boom".to_string())
    }

    impl DataSource for MemorySource {
        async fn requirements(&self, inputs: &RequirementInputs) -> Result<RequirementGroup, AssistError> {
            let requirements = self
                .requirements
                .get(&(inputs.fy_id.clone(), inputs.major_id.clone()))
                .cloned()
                .ok_or_else(status_error)?;
            Ok(RequirementGroup {
                inputs: inputs.clone(),
                requirements,
            })
        }

        async fn articulations(&self, _inputs: &[RequirementInputs]) -> Result<Vec<ArticulationObj>, AssistError> {
            if self.fail_articulations {
                return Err(status_error());
            }
            Ok(self.articulations.clone())
        }

        async fn equivalence(
            &self,
            inputs: &[RequirementInputs],
        ) -> Result<Option<Vec<ArticulationObj>>, AssistError> {
            if let Ok(mut colleges) = self.equivalence_colleges.lock() {
                colleges.extend(inputs.iter().map(|i| i.ccc_id.clone()));
            }
            if self.fail_equivalence {
                return Err(status_error());
            }
            Ok(self.equivalence.clone())
        }
    }

    /// Two FY courses: 61A has a single option, 61B two options.
    fn source() -> MemorySource {
        let mut source = MemorySource::default();
        source.requirements.insert(
            ("79".to_string(), "cs".to_string()),
            vec![
                Requirement::and(vec![CourseGroup::new(
                    GroupRule::AllCourses,
                    vec![fy("61A", "61A"), fy("61B", "61B")],
                )]),
                Requirement::and(vec![CourseGroup::new(GroupRule::AllCourses, vec![fy("70", "70")])]),
            ],
        );
        source.articulations = vec![agreement(
            "113",
            "79",
            "cs",
            vec![
                Articulation::new(fy("61A", "61A"), vec![vec![cc("100", "CIS", "22A", "Python")]]),
                Articulation::new(
                    fy("61B", "61B"),
                    vec![
                        vec![cc("101", "CIS", "22B", "Intermediate Python")],
                        vec![cc("102", "CIS", "35A", "Java")],
                    ],
                ),
            ],
        )];
        source
    }

    fn selection() -> Vec<Selection> {
        vec![Selection::new("79", "cs")]
    }

    fn colleges() -> InstitutionDirectory {
        InstitutionDirectory::new(vec![
            Institution::new("113", "De Anza College"),
            Institution::new("51", "Foothill College"),
        ])
    }

    fn hit(college: &str, option: Vec<FoundCourse>) -> CollegeHits {
        CollegeHits {
            college_name: Some(college.to_string()),
            agreement_link: None,
            options: vec![option],
        }
    }

    async fn link(session: &mut Session, source: &MemorySource, fy_course: &Course, hit: &CollegeHits) -> Adoption {
        session
            .link_search_hit(source, &colleges(), fy_course, hit, &hit.options[0])
            .await
    }

    #[tokio::test]
    async fn open_builds_initial_plan() {
        let session = Session::open(&source(), "113", "75", &selection()).await.unwrap();
        assert_eq!(session.requirements().len(), 1);
        let keys: Vec<_> = session.plan().iter().map(PlanCourse::key).collect();
        assert_eq!(keys, vec![CourseKey::course("100")]);

        let statuses = session.statuses();
        assert_eq!(statuses.len(), 2);
        assert!(!statuses[0].completed);
        assert!(!session.is_complete());

        let unresolved: Vec<_> = session.unresolved_courses().into_iter().map(|(_, c)| c.key()).collect();
        assert_eq!(unresolved, vec![CourseKey::course("61B"), CourseKey::course("70")]);
    }

    #[tokio::test]
    async fn open_requires_selection() {
        let err = Session::open(&source(), "113", "75", &[]).await.unwrap_err();
        assert!(matches!(err, SessionError::NoSelections));
    }

    #[tokio::test]
    async fn open_fails_when_any_fetch_fails() {
        let mut failing = source();
        failing.fail_articulations = true;
        let err = Session::open(&failing, "113", "75", &selection()).await.unwrap_err();
        assert!(matches!(err, SessionError::Fetch { what: "articulations", .. }));

        let err = Session::open(&source(), "113", "75", &[Selection::new("79", "cs"), Selection::new("1", "math")])
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Fetch { what: "requirements", .. }));
    }

    #[tokio::test]
    async fn select_option_and_exclude_complete_the_plan() {
        let mut session = Session::open(&source(), "113", "75", &selection()).await.unwrap();
        let inputs = session.requirements()[0].inputs.clone();

        let err = session.select_option(&fy("61B", "61B"), &inputs, 5).unwrap_err();
        assert!(matches!(err, SessionError::NoSuchOption { index: 5, .. }));
        assert!(matches!(
            session.select_option(&fy("70", "70"), &inputs, 0),
            Err(SessionError::NoArticulation(_))
        ));

        session.select_option(&fy("61B", "61B"), &inputs, 1).unwrap();
        assert!(session.statuses()[0].completed);
        assert!(session.plan().iter().any(|pc| pc.key() == CourseKey::course("102")));

        assert!(session.exclude(fy("70", "70")));
        assert!(!session.exclude(fy("70", "70")));
        assert!(session.is_complete());
        assert!(session.unresolved_courses().is_empty());
    }

    #[tokio::test]
    async fn manually_added_course_counts_toward_options() {
        let mut session = Session::open(&source(), "113", "75", &selection()).await.unwrap();
        session.add_course(cc("101", "CIS", "22B", "Intermediate Python"));
        assert!(session.statuses()[0].completed);
    }

    #[tokio::test]
    async fn search_target_appends_session_year() {
        let session = Session::open(&source(), "113", "75", &selection()).await.unwrap();
        let inputs = session.requirements()[0].inputs.clone();

        let target = session.search_target(&fy("123456", "1"), &inputs).unwrap();
        assert_eq!(target.course.to_string(), "123456_75");
        assert_eq!(target.receiving_id, "79");
        assert_eq!(target.major_key, "cs");

        let target = session.search_target(&fy("123456_70", "1"), &inputs).unwrap();
        assert_eq!(target.course.to_string(), "123456_70");
    }

    #[tokio::test]
    async fn link_prefers_loaded_dataset() {
        let source = source();
        let mut session = Session::open(&source, "113", "75", &selection()).await.unwrap();
        let found = hit("Foothill College", vec![FoundCourse::new("CIS", "22B", "Intermediate Python")]);

        let adoption = link(&mut session, &source, &fy("61B", "61B"), &found).await;
        assert_eq!(adoption, Adoption::Linked { added: 1 });
        assert!(source.equivalence_colleges.lock().unwrap().is_empty());
        assert!(session.statuses()[0].completed);
    }

    #[tokio::test]
    async fn link_falls_back_to_equivalence_dataset() {
        let mut source = source();
        source.equivalence = Some(vec![agreement(
            "200",
            "79",
            "cs",
            vec![Articulation::new(
                fy("70", "70"),
                vec![vec![cc("300", "MATH", "22", "Discrete Math")]],
            )],
        )]);
        let mut session = Session::open(&source, "113", "75", &selection()).await.unwrap();
        let found = hit("Foothill College", vec![FoundCourse::new("MATH", "022", "Discrete Math")]);

        let adoption = link(&mut session, &source, &fy("70", "70"), &found).await;
        assert_eq!(adoption, Adoption::Linked { added: 1 });
        assert_eq!(*source.equivalence_colleges.lock().unwrap(), vec!["51".to_string()]);
        assert!(session.statuses()[1].completed);
        let linked = session.plan().iter().find(|pc| pc.key() == CourseKey::course("300")).unwrap();
        assert!(linked.covers(&CourseKey::course("70")));
    }

    #[tokio::test]
    async fn equivalence_failure_leaves_hit_unlinked() {
        let mut source = source();
        source.fail_equivalence = true;
        let mut session = Session::open(&source, "113", "75", &selection()).await.unwrap();
        let before = session.plan().len();

        let found = hit("Foothill College", vec![FoundCourse::new("MATH", "22", "Discrete Math")]);
        let adoption = link(&mut session, &source, &fy("70", "70"), &found).await;
        assert_eq!(adoption, Adoption::Unlinked);
        assert_eq!(session.plan().len(), before);
        assert!(!session.statuses()[1].completed);
    }

    #[tokio::test]
    async fn unknown_hit_college_skips_equivalence_fetch() {
        let mut source = source();
        source.equivalence = Some(Vec::new());
        let mut session = Session::open(&source, "113", "75", &selection()).await.unwrap();

        let found = hit("Mission College", vec![FoundCourse::new("MATH", "22", "Discrete Math")]);
        let adoption = link(&mut session, &source, &fy("70", "70"), &found).await;
        assert_eq!(adoption, Adoption::Unlinked);
        assert!(source.equivalence_colleges.lock().unwrap().is_empty());
    }

    #[test]
    fn selection_parse() {
        assert_eq!(Selection::parse("79:cs"), Some(Selection::new("79", "cs")));
        assert_eq!(
            Selection::parse("79:75/113/to/79/Major/abc"),
            Some(Selection::new("79", "75/113/to/79/Major/abc"))
        );
        assert_eq!(Selection::parse("79"), None);
        assert_eq!(Selection::parse(":cs"), None);
    }
}
