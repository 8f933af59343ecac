//! Task-specific prompt templates.
//!
//! [`assemble`] is a pure function of its input: the same chunks always
//! produce a byte-identical prompt.

/// Documents with fewer chunks than this get the short summary template.
pub const SHORT_DOCUMENT_THRESHOLD: usize = 10;

/// What to build a prompt for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptInput<'a> {
    /// Summarize clustered representative chunks.
    Summarize {
        /// Number of chunks the whole document was split into.
        doc_length: usize,
        /// Representative chunk texts, in prompt order.
        sections: &'a [&'a str],
    },
    /// Write a structured report from representative chunks.
    Report {
        /// Representative chunk texts, in prompt order.
        sections: &'a [&'a str],
    },
    /// Answer a question from retrieved chunks.
    Answer {
        /// The user's question.
        question: &'a str,
        /// Retrieved chunk texts, most relevant first.
        context: &'a [&'a str],
    },
}

const SHORT_SUMMARY_INTRO: &str = "Please summarize the following document:";

const SHORT_SUMMARY_FORMAT: &str = "Do not hallucinate or add information not found in the document.

FORMAT YOUR RESPONSE WITH CLEAN MARKDOWN:
- Use # for main heading, ## for subheadings
- Use bullet points (- or *) for lists
- Use proper line breaks between paragraphs
- Use bold (**text**) for emphasis";

const SECTIONED_SUMMARY_INSTRUCTIONS: &str = "Create a comprehensive summary that captures the main points and important details.

INSTRUCTIONS:
- Do not hallucinate or add information not found in the document
- Create appropriate headings and subheadings based on the content
- Use bullets and new lines to make the summary readable

YOUR RESPONSE MUST BE IN PROPER MARKDOWN FORMAT:
- Use # for main heading (only one main heading)
- Use ## and ### for subheadings
- Use bullet points (- or *) for lists
- For tables, use standard markdown table format:
  | Header1 | Header2 |
  |---------|---------|
  | Value1  | Value2  |
- For code blocks, use triple backticks
- Put a blank line between paragraphs
- Use bold (**text**) for emphasis

DOCUMENT SECTIONS:
";

const REPORT_INSTRUCTIONS: &str = "You are a professional research report generator. Your task is to create a comprehensive, well-structured report based on the provided research document sections.

Guidelines for the report:
1. Structure the report with clear sections:
   - Executive Summary
   - Introduction
   - Methodology
   - Key Findings
   - Analysis
   - Conclusions
   - Recommendations (if applicable)

2. Formatting requirements:
   - Use Markdown formatting
   - Include appropriate headings and subheadings
   - Use bullet points for lists
   - Include relevant quotes or data points
   - Maintain academic tone and professional language

3. Content requirements:
   - Focus on factual information from the source
   - Maintain objectivity
   - Highlight key insights and findings
   - Include relevant statistics or data
   - Ensure logical flow between sections

4. Important:
   - Do not add information not present in the source
   - Do not make assumptions
   - Maintain accuracy and precision
   - Use clear and concise language

Here are the document sections to analyze:

";

const ANSWER_INTRO: &str = "Answer the questions based on the provided context only.
Please provide the most accurate response based on the question.
Format your response in markdown.";

const ANSWER_RULES: &str = "IMPORTANT:
- Do not hallucinate.
- Do not guess.
- If the answer is not in the context, say \"I don't have enough information to answer this question.\"
- DO NOT Start with \"According to the context...\" or \"Based on the context...\" just provide the answer naturally.
- Use proper bullets and lines for the answer where ever needed.
- Format your response in markdown with proper headings, lists, and code blocks if needed.";

/// Build the prompt for `input`.
pub fn assemble(input: &PromptInput<'_>) -> String {
    match *input {
        PromptInput::Summarize { doc_length, sections } if doc_length < SHORT_DOCUMENT_THRESHOLD => {
            format!(
                "{SHORT_SUMMARY_INTRO}\n\n{}\n\n{SHORT_SUMMARY_FORMAT}",
                sections.join("\n\n")
            )
        }
        PromptInput::Summarize { sections, .. } => {
            let mut prompt = format!(
                "Please summarize the following document which has been divided into {} sections.\n{SECTIONED_SUMMARY_INSTRUCTIONS}",
                sections.len()
            );
            for (i, section) in sections.iter().enumerate() {
                prompt.push_str(&format!("\nSection {}:\n{section}\n", i + 1));
            }
            prompt
        }
        PromptInput::Report { sections } => {
            let mut prompt = REPORT_INSTRUCTIONS.to_string();
            for (i, section) in sections.iter().enumerate() {
                prompt.push_str(&format!("Section {}:\n{section}\n\n", i + 1));
            }
            prompt
        }
        PromptInput::Answer { question, context } => format!(
            "{ANSWER_INTRO}\n\nContext:\n{}\n\nQuestion: {question}\n\n{ANSWER_RULES}",
            context.join("\n\n")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTIONS: [&str; 3] = [
        "Photosynthesis converts light into chemical energy.",
        "The Roman Empire expanded across the Mediterranean.",
        "Neural networks learn weights by gradient descent.",
    ];

    #[test]
    fn short_documents_use_concatenated_context() {
        let prompt = assemble(&PromptInput::Summarize { doc_length: 3, sections: &SECTIONS });
        assert!(prompt.starts_with("Please summarize the following document:\n\n"));
        assert!(prompt.contains(&SECTIONS.join("\n\n")));
        assert!(prompt.contains("FORMAT YOUR RESPONSE WITH CLEAN MARKDOWN"));
        assert!(prompt.contains("Do not hallucinate or add information not found in the document."));
        assert!(!prompt.contains("Section 1:"));
    }

    #[test]
    fn long_documents_label_each_section() {
        let prompt = assemble(&PromptInput::Summarize { doc_length: 12, sections: &SECTIONS });
        assert!(prompt.contains("divided into 3 sections"));
        assert!(prompt.contains("Do not hallucinate"));
        for (i, section) in SECTIONS.iter().enumerate() {
            assert!(prompt.contains(&format!("\nSection {}:\n{section}\n", i + 1)));
        }
        assert!(!prompt.contains("Section 4:"));
    }

    #[test]
    fn threshold_is_exclusive() {
        let at = assemble(&PromptInput::Summarize { doc_length: 10, sections: &SECTIONS });
        let below = assemble(&PromptInput::Summarize { doc_length: 9, sections: &SECTIONS });
        assert!(at.contains("Section 1:"));
        assert!(!below.contains("Section 1:"));
    }

    #[test]
    fn report_lists_required_sections() {
        let prompt = assemble(&PromptInput::Report { sections: &SECTIONS });
        for heading in [
            "Executive Summary",
            "Introduction",
            "Methodology",
            "Key Findings",
            "Analysis",
            "Conclusions",
            "Recommendations",
        ] {
            assert!(prompt.contains(heading), "missing {heading}");
        }
        assert!(prompt.contains("Do not add information not present in the source"));
        assert!(prompt.ends_with(&format!("Section 3:\n{}\n\n", SECTIONS[2])));
    }

    #[test]
    fn answer_interpolates_context_and_question() {
        let prompt = assemble(&PromptInput::Answer {
            question: "What does photosynthesis produce?",
            context: &SECTIONS[..2],
        });
        assert!(prompt.contains(&format!("Context:\n{}\n\n{}\n", SECTIONS[0], SECTIONS[1])));
        assert!(prompt.contains("Question: What does photosynthesis produce?"));
        assert!(prompt.contains("I don't have enough information to answer this question."));
    }

    #[test]
    fn placeholders_in_inputs_are_left_alone() {
        let prompt =
            assemble(&PromptInput::Answer { question: "What is {context}?", context: &["{input}"] });
        assert!(prompt.contains("Context:\n{input}\n"));
        assert!(prompt.contains("Question: What is {context}?"));
    }

    #[test]
    fn assembling_is_idempotent() {
        for input in [
            PromptInput::Summarize { doc_length: 3, sections: &SECTIONS },
            PromptInput::Summarize { doc_length: 40, sections: &SECTIONS },
            PromptInput::Report { sections: &SECTIONS },
            PromptInput::Answer { question: "q", context: &SECTIONS },
        ] {
            assert_eq!(assemble(&input), assemble(&input));
        }
    }
}
