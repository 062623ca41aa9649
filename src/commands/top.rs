use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{input_rows, to_pipeline};
use crate::ops;
use crate::MedidoresPlugin;

pub struct Top;

impl PluginCommand for Top {
    type Plugin = MedidoresPlugin;

    fn name(&self) -> &str {
        "medidores top"
    }

    fn description(&self) -> &str {
        "Most frequent values of a category (state, city, type, result, owner)"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::table(), Type::table())
            .required(
                "category",
                SyntaxShape::String,
                "state, city, type, result, owner",
            )
            .named(
                "count",
                SyntaxShape::Int,
                "Number of entries (default: 5)",
                Some('n'),
            )
            .switch("distinct", "List every distinct value, sorted, instead", Some('d'))
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["inmetro", "ranking", "frequency", "group", "distinct"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![
            Example {
                example: "open medidores.json | medidores top city --count 10",
                description: "Ten cities with the most meters",
                result: None,
            },
            Example {
                example: "open medidores.json | medidores top state --distinct",
                description: "Every state present, for a dropdown",
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
        let category: String = call.req(0)?;
        let rows = input_rows(input);
        let result = if call.has_flag("distinct")? {
            ops::op_distinct(&rows, &category)
        } else {
            let n = call.get_flag::<i64>("count")?.unwrap_or(5).max(0) as usize;
            ops::op_top(&rows, &category, n)
        };
        to_pipeline(result, call.head)
    }
}
