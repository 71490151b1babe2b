pub mod spec;

pub use spec::{
    load_document_from_path, parse_id_list, resolve, resolve_scenario, resolve_selection,
    validate, InfrastructureSelection, InfrastructureSpec, PathsSpec, ResolvedScenario,
    ScenarioDocument, ScenarioSpec,
};
