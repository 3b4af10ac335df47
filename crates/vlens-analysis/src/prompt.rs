//! Prompt template for persona analysis.

/// Build the analysis prompt for one persona.
///
/// The model is asked for 3-5 timestamped interest changes and an overall
/// recommendation, returned as a single JSON object with the keys
/// `timestamp_analysis` and `overall_summary`.
pub fn build_persona_prompt(persona_description: &str) -> String {
    format!(
        r#"你是一名顶级的短视频内容策略师。请严格且仅仅从以下 [人物画像] 的视角，对提供的视频进行深入分析。

[人物画像]
{persona_description}

[分析任务]
1.  [时间点分析]: 请详细识别出视频中能引起该画像“兴趣激增”或“兴趣下降”的关键时间点，并解释原因。请至少找出3-5个关键点。输出格式为 "mm:ss - 兴趣激增/下降：具体原因..."，每个时间点占一行。
2.  [综合评价与建议]: 请基于以上分析，为该视频给出一个总体的、详细的“综合评价与建议”，内容需要有建设性，告诉创作者如何优化才能更好地吸引这类人群。

[输出要求]
你的最终输出必须是一个单一的、可以被直接解析的JSON对象，严格遵循以下结构，不要添加任何额外的解释或Markdown标记。
{{
  "timestamp_analysis": "mm:ss - 兴趣激增：原因...\nmm:ss - 兴趣下降：原因...",
  "overall_summary": "你的综合评价与建议..."
}}
"#
    )
}
