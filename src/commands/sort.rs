use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{input_rows, to_pipeline};
use crate::ops;
use crate::MedidoresPlugin;

pub struct Sort;

impl PluginCommand for Sort {
    type Plugin = MedidoresPlugin;

    fn name(&self) -> &str {
        "medidores sort"
    }

    fn description(&self) -> &str {
        "Stable sort of speed-meter records by a column path"
    }

    fn extra_description(&self) -> &str {
        "Columns: stateCode, stateName, city, verificationSite, lastVerificationDate, validUntilDate, lastResult, instrumentType, owner.name, lanes.nominalSpeed, lanes.N.field, history.N.date. Text compares case- and accent-insensitively; missing values sort last."
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::table(), Type::table())
            .required("column", SyntaxShape::String, "Column path to sort by")
            .switch("desc", "Sort descending", Some('d'))
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["inmetro", "order", "sort-by"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![
            Example {
                example: "open medidores.json | medidores sort validUntilDate",
                description: "Soonest-expiring meters first",
                result: None,
            },
            Example {
                example: "open medidores.json | medidores sort lanes.nominalSpeed --desc",
                description: "Fastest nominal speed first",
                result: None,
            },
        ]
    }

    fn run(
        &self,
        _plugin: &MedidoresPlugin,
        _engine: &EngineInterface,
        call: &EvaluatedCall,
        input: PipelineData,
    ) -> Result<PipelineData, LabeledError> {
        let column: String = call.req(0)?;
        let direction = if call.has_flag("desc")? { "desc" } else { "asc" };
        to_pipeline(ops::op_sort(&input_rows(input), &column, direction), call.head)
    }
}
