// Shared prompt constants.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Closing rule appended to every generation prompt.
pub const JSON_ONLY_INSTRUCTION: &str = "\
    IMPORTANTE: Responde SOLO con el arreglo JSON. Sin texto antes ni después, \
    sin comentarios y sin bloques ```.";
