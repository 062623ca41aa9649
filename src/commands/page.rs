use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{input_rows, to_pipeline};
use crate::ops;
use crate::pipeline::app_state::ViewConfig;
use crate::MedidoresPlugin;

pub struct Page;

impl PluginCommand for Page {
    type Plugin = MedidoresPlugin;

    fn name(&self) -> &str {
        "medidores page"
    }

    fn description(&self) -> &str {
        "One page of speed-meter records, with page bounds and the page-button window"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::table(), Type::record())
            .named(
                "page",
                SyntaxShape::Int,
                "1-based page; clamped to the last page (default: 1)",
                Some('p'),
            )
            .named(
                "size",
                SyntaxShape::Int,
                "Rows per page (default: 25)",
                Some('n'),
            )
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["inmetro", "paginate", "pagination"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![Example {
            example: "open medidores.json | medidores page --page 2 --size 10 | get items",
            description: "Records 11 through 20",
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
        let view = ViewConfig::default();
        let page = call.get_flag::<i64>("page")?.unwrap_or(1).max(1) as usize;
        let size = call
            .get_flag::<i64>("size")?
            .map_or(view.page_size, |n| n.max(1) as usize);
        let result = ops::op_paginate(&input_rows(input), page, size, view.page_window_radius);
        to_pipeline(result, call.head)
    }
}
