use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{
    Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type, Value,
};

use super::util::{input_rows, to_labeled, to_pipeline};
use crate::ops;
use crate::MedidoresPlugin;

pub struct Export;

impl PluginCommand for Export {
    type Plugin = MedidoresPlugin;

    fn name(&self) -> &str {
        "medidores export"
    }

    fn description(&self) -> &str {
        "Export speed-meter records as pretty JSON or quoted CSV"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::table(), Type::Any)
            .named(
                "format",
                SyntaxShape::String,
                "json or csv (default: json)",
                Some('f'),
            )
            .switch(
                "with-name",
                "Return {fileName, format, content} instead of the bare text",
                None,
            )
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["inmetro", "csv", "json", "download", "save"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![
            Example {
                example: "open medidores.json | medidores export --format csv | save medidores.csv",
                description: "Save filtered records as CSV",
                result: None,
            },
            Example {
                example: "open medidores.json | medidores export --with-name | get fileName",
                description: "Suggested dated file name",
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
        let format = call
            .get_flag::<String>("format")?
            .unwrap_or_else(|| "json".into());
        let rows = input_rows(input);
        if call.has_flag("with-name")? {
            return to_pipeline(ops::op_export(&rows, &format), call.head);
        }
        let text = ops::op_export_text(&rows, &format).map_err(|e| to_labeled(e, call.head))?;
        Ok(PipelineData::Value(Value::string(text, call.head), None))
    }
}
