use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{input_rows, to_pipeline};
use crate::ops;
use crate::pipeline::filter::CriteriaParams;
use crate::MedidoresPlugin;

pub struct Filter;

impl PluginCommand for Filter {
    type Plugin = MedidoresPlugin;

    fn name(&self) -> &str {
        "medidores filter"
    }

    fn description(&self) -> &str {
        "Keep speed-meter records matching every given criterion"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::table(), Type::table())
            .named("state", SyntaxShape::String, "State code or name (exact)", Some('s'))
            .named("city", SyntaxShape::String, "City (exact)", Some('c'))
            .named(
                "result",
                SyntaxShape::String,
                "Result: approved, rejected, unknown",
                Some('r'),
            )
            .named("type", SyntaxShape::String, "Instrument type substring", Some('t'))
            .named("search", SyntaxShape::String, "Free-text search", Some('q'))
            .named(
                "region",
                SyntaxShape::String,
                "Region: norte, nordeste, centro-oeste, sudeste, sul",
                None,
            )
            .named(
                "date-field",
                SyntaxShape::String,
                "Date the range applies to: lastVerification (default) or validUntil",
                None,
            )
            .named("from", SyntaxShape::String, "Inclusive lower date bound", None)
            .named("to", SyntaxShape::String, "Inclusive upper date bound", None)
            .named("speed-min", SyntaxShape::Number, "Minimum nominal speed", None)
            .named("speed-max", SyntaxShape::Number, "Maximum nominal speed", None)
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["inmetro", "where", "search", "state", "city"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![
            Example {
                example: "open medidores.json | medidores filter --state SP --result rejected",
                description: "Rejected meters in São Paulo",
                result: None,
            },
            Example {
                example: "open medidores.json | medidores filter --date-field validUntil --to 2025-12-31",
                description: "Meters whose validity ends by the end of 2025",
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
        let params = CriteriaParams {
            state: call.get_flag("state")?,
            city: call.get_flag("city")?,
            result: call.get_flag("result")?,
            instrument_type: call.get_flag("type")?,
            search: call.get_flag("search")?,
            region: call.get_flag("region")?,
            date_field: call.get_flag("date-field")?,
            date_from: call.get_flag("from")?,
            date_to: call.get_flag("to")?,
            speed_min: call.get_flag::<f64>("speed-min")?,
            speed_max: call.get_flag::<f64>("speed-max")?,
        };
        to_pipeline(ops::op_filter(&input_rows(input), params), call.head)
    }
}
