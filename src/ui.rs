use iocraft::prelude::*;

use crate::workflow::{UploadReport, UploadResult};

#[derive(Default, Props)]
pub struct ProgressLineProps {
    pub percent: u8,
}

#[component]
pub fn ProgressLine(props: &ProgressLineProps) -> impl Into<AnyElement<'static>> {
    const WIDTH: usize = 30;
    let filled = usize::from(props.percent.min(100)) * WIDTH / 100;
    element! {
        View(flex_direction: FlexDirection::Row) {
            Text(content: "[", color: Color::DarkGrey)
            Text(content: "█".repeat(filled), color: Color::Cyan)
            Text(content: "░".repeat(WIDTH - filled), color: Color::DarkGrey)
            Text(content: format!("] {:>3}%", props.percent))
        }
    }
}

#[derive(Default, Props)]
struct ResultRowProps {
    result: Option<ResultSummary>,
}

#[derive(Clone)]
struct ResultSummary {
    path: String,
    status: Option<u16>,
    error: Option<String>,
}

impl From<&UploadResult> for ResultSummary {
    fn from(result: &UploadResult) -> Self {
        Self {
            path: result.path.display().to_string(),
            status: result.status,
            error: result.error.as_ref().map(ToString::to_string),
        }
    }
}

#[component]
fn ResultRow(props: &ResultRowProps) -> impl Into<AnyElement<'static>> {
    let Some(result) = props.result.clone() else {
        return element!(View()).into_any();
    };
    let status = result
        .status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "---".to_string());

    match result.error {
        None => element! {
            View(flex_direction: FlexDirection::Row) {
                Text(color: Color::Green, content: "◆ ")
                Text(content: format!("{} ", status))
                Text(content: result.path)
            }
        }
        .into_any(),
        Some(error) => element! {
            View(flex_direction: FlexDirection::Column) {
                View(flex_direction: FlexDirection::Row) {
                    Text(color: Color::Red, content: "▲ ")
                    Text(content: format!("{} ", status))
                    Text(content: result.path)
                }
                Text(color: Color::Red, content: format!("│ {}", error))
            }
        }
        .into_any(),
    }
}

#[derive(Default, Props)]
pub struct UploadSummaryProps {
    pub folder: String,
    pub map_id: Option<u64>,
    pub results: Vec<UploadResultView>,
}

/// Rendering-only copy of an [`UploadResult`].
#[derive(Clone)]
pub struct UploadResultView(ResultSummary);

impl UploadSummaryProps {
    pub fn from_report(report: &UploadReport) -> Self {
        Self {
            folder: report.folder.clone(),
            map_id: report.map.map(|m| m.map_id),
            results: report
                .results
                .iter()
                .map(|r| UploadResultView(r.into()))
                .collect(),
        }
    }
}

#[component]
pub fn UploadSummary(props: &UploadSummaryProps) -> impl Into<AnyElement<'static>> {
    let failed = props.results.iter().filter(|r| r.0.error.is_some()).count();
    let uploaded = props.results.len() - failed;

    element! {
        View(flex_direction: FlexDirection::Column) {
            View(flex_direction: FlexDirection::Row) {
                Text(content: "┌ ")
                View(background_color: Color::Blue) {
                    Text(content: &props.folder, color: Color::White)
                }
                #(props.map_id.map(|id| element! {
                    Text(content: format!("  map {}", id))
                }))
            }
            #(props.results.iter().map(|r| element! {
                ResultRow(result: Some(r.0.clone()))
            }))
            View(flex_direction: FlexDirection::Row) {
                Text(content: "└ ")
                Text(content: format!("{} uploaded, {} failed", uploaded, failed))
            }
        }
    }
}

#[derive(Default, Props)]
pub struct MessageProps {
    pub message: String,
}

#[component]
pub fn ErrorMessage(props: &MessageProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Row) {
            Text(color: Color::Red, weight: Weight::Bold, content: "✗ ")
            Text(content: &props.message)
        }
    }
}

#[component]
pub fn SuccessMessage(props: &MessageProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Row) {
            Text(color: Color::Green, weight: Weight::Bold, content: "✓ ")
            Text(content: &props.message)
        }
    }
}

#[component]
pub fn ConfigHeader() -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Column, margin_bottom: 1) {
            Text(weight: Weight::Bold, content: "gcup configuration")
            Text(color: Color::DarkGrey, content: "Press enter to keep the value in brackets")
        }
    }
}

#[derive(Default, Props)]
pub struct InputPromptProps {
    pub prompt: String,
    pub default: Option<String>,
    pub description: Option<String>,
}

#[component]
pub fn InputPrompt(props: &InputPromptProps) -> impl Into<AnyElement<'static>> {
    let prompt = match &props.default {
        Some(default) => format!("{} [{}]", props.prompt, default),
        None => props.prompt.clone(),
    };
    element! {
        View(flex_direction: FlexDirection::Column) {
            Text(weight: Weight::Bold, content: prompt)
            #(props.description.as_ref().map(|d| element! {
                Text(color: Color::DarkGrey, content: d.clone())
            }))
        }
    }
}
