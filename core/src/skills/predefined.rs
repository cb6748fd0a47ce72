//! Built-in skills.

use super::{SkillCategory, SkillDefinition};

const SUMMARIZE_SYSTEM: &str = "You are a professional summarization assistant. Produce a concise, accurate summary of the text the user provides.

Requirements:
1. Keep the core information and drop filler
2. Keep the summary under 30% of the original length
3. Highlight the key points";

const SUMMARIZE_TEMPLATE: &str = "Summarize the following text:

```
{{input}}
```

Summary:";

const TRANSLATE_SYSTEM: &str = "You are a professional translator. Translate the text the user provides into English.

Requirements:
1. Convey the original meaning accurately
2. Use natural, fluent English
3. Keep technical terms precise
4. Leave code and document formatting unchanged";

const TRANSLATE_TEMPLATE: &str = "Translate the following text into English:

```
{{input}}
```

Translation:";

const CODE_ANALYZE_SYSTEM: &str = "You are an experienced code reviewer. Analyze the code the user provides and give detailed improvement suggestions.

Cover:
1. Overall code quality
2. Potential bugs or problems
3. Performance improvements
4. Readability improvements
5. Best-practice recommendations

Use clear headings.";

const CODE_ANALYZE_TEMPLATE: &str = "Analyze the following code:

```
{{input}}
```

Detailed analysis and suggestions:";

pub const SUMMARIZE: &str = "summarize";
pub const TRANSLATE: &str = "translate";
pub const CODE_ANALYZE: &str = "code-analyze";

pub fn predefined_skills() -> Vec<SkillDefinition> {
    vec![
        builtin(
            SUMMARIZE,
            "Summarize",
            "Generate a concise summary of the input text",
            "📝",
            SUMMARIZE_SYSTEM,
            SUMMARIZE_TEMPLATE,
        ),
        builtin(
            TRANSLATE,
            "Translate to English",
            "Translate the input text into English",
            "🌐",
            TRANSLATE_SYSTEM,
            TRANSLATE_TEMPLATE,
        ),
        builtin(
            CODE_ANALYZE,
            "Analyze code",
            "Review code quality, find problems and suggest improvements",
            "🔍",
            CODE_ANALYZE_SYSTEM,
            CODE_ANALYZE_TEMPLATE,
        ),
    ]
}

fn builtin(
    id: &str,
    name: &str,
    description: &str,
    icon: &str,
    system: &str,
    template: &str,
) -> SkillDefinition {
    SkillDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        icon: Some(icon.to_string()),
        category: SkillCategory::Predefined,
        system_prompt: Some(system.to_string()),
        prompt_template: template.to_string(),
    }
}
