use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, Type};

use super::util::{input_rows, to_pipeline};
use crate::ops;
use crate::MedidoresPlugin;

pub struct Normalize;

impl PluginCommand for Normalize {
    type Plugin = MedidoresPlugin;

    fn name(&self) -> &str {
        "medidores normalize"
    }

    fn description(&self) -> &str {
        "Normalize raw speed-meter records into the canonical shape"
    }

    fn extra_description(&self) -> &str {
        "Accepts PascalCase open-data rows, lowercase sample rows, or canonical camelCase rows. Missing values become \"N/A\"."
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::table(), Type::table())
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["inmetro", "radar", "canonical", "clean"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![Example {
            example: "open medidores.json | medidores normalize",
            description: "Normalize an open-data file",
            result: None,
        }]
    }

    fn run(
        &self,
        _plugin: &MedidoresPlugin,
        _engine: &EngineInterface,
        call: &EvaluatedCall,
        input: PipelineData,
    ) -> Result<PipelineData, LabeledError> {
        to_pipeline(ops::op_normalize(&input_rows(input)), call.head)
    }
}
