// All LLM prompt constants for the Generation module.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::generation::generator::GenerationParams;
use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::models::problem::{
    ProblemType, SimpleKind, PREVIOUS_RESULT_TOKEN, UNKNOWN_TOKEN,
};

/// System prompt for problem generation.
pub const GENERATION_SYSTEM: &str = "Eres un docente experto en didáctica de la matemática \
    para educación básica. Redactas problemas verbales de aritmética claros, realistas y \
    adecuados al nivel indicado. \
    DEBES responder únicamente con un arreglo JSON válido. \
    NO incluyas texto fuera del arreglo. \
    NO uses bloques de código markdown.";

/// Generation prompt template.
/// Replace: {count}, {grade}, {type}, {type_description}, {theme_line},
///          {range_line}, {operations_line}, {schema}, {type_rules}, {json_only}
pub const GENERATION_PROMPT_TEMPLATE: &str = r#"Genera exactamente {count} problema(s) verbal(es) de aritmética para estudiantes de {grade}° básico.

TIPO DE PROBLEMA: {type} — {type_description}
{theme_line}
RANGO NUMÉRICO PARA {grade}° BÁSICO: {range_line}
OPERACIONES ADECUADAS: {operations_line}

Devuelve un ARREGLO JSON con exactamente {count} objeto(s). Cada objeto sigue este esquema EXACTO:
{schema}

{type_rules}

REGLAS GENERALES:
1. "grade" debe ser {grade} y "type" debe ser "{type}" en todos los objetos
2. Todos los valores numéricos de "data" y "answer" son strings con solo dígitos y punto decimal (sin unidades, sin símbolos de moneda)
3. Usa "{unknown}" en "data" para la cantidad que el estudiante debe encontrar
4. "operation" debe ser exactamente uno de: "+", "-", "*", "/"
5. "answer" es el valor numérico que resuelve el problema
6. "fullAnswer" es una respuesta completa en una oración; "hint" es una pista breve sin revelar el resultado
7. "logicCheck" explica por qué el resultado tiene sentido
8. Cada problema debe ser distinto de los demás

{json_only}"#;

/// Extra rules for two-step problems. Replace: {previous}, {step_keys}
const TWO_STEP_RULES: &str = r#"REGLAS PARA DOS_OPERACIONES:
- NO incluyas "data" ni "labels" en el nivel superior; todo va dentro de "steps"
- "steps" tiene EXACTAMENTE 2 pasos, en orden
- El "type" de cada paso es uno de PPT, UVT, COMPARACION o CAMBIO, con estas claves para "data" y "labels":
{step_keys}
- En el segundo paso, usa "{previous}" en "data" donde va el resultado del primer paso
- El "answer" del nivel superior es el resultado final del segundo paso"#;

/// Extra rules for single-operation problems. Replace: {keys}, {result_key}
const SIMPLE_RULES: &str = r#"REGLAS PARA ESTE TIPO:
- "data" y "labels" usan EXACTAMENTE las claves {keys}, ni más ni menos
- "labels" describe en palabras qué representa cada cantidad dentro de la historia
- Normalmente la incógnita es "{result_key}", pero puede ser cualquiera de las claves"#;

/// Numeric range guidance per grade: (upper bound, decimals allowed).
fn grade_range(grade: u8) -> (u32, bool) {
    match grade {
        1 => (20, false),
        2 => (100, false),
        3 => (1_000, false),
        4 => (10_000, false),
        5 => (100_000, true),
        _ => (1_000_000, true),
    }
}

fn range_line(grade: u8) -> String {
    let (max, decimals) = grade_range(grade);
    if decimals {
        format!("números entre 0 y {max}; se permiten decimales con hasta dos cifras")
    } else {
        format!("números naturales entre 0 y {max}, sin decimales")
    }
}

fn operations_line(grade: u8) -> &'static str {
    if grade <= 2 {
        "adición (+) y sustracción (-)"
    } else {
        "adición (+), sustracción (-), multiplicación (*) y división (/) exacta"
    }
}

fn type_description(problem_type: ProblemType) -> &'static str {
    match problem_type {
        ProblemType::Simple(SimpleKind::Ppt) => {
            "parte-parte-todo: dos partes (p1, p2) que juntas forman un total (t)"
        }
        ProblemType::Simple(SimpleKind::Uvt) => {
            "unidad-veces-total: un valor por unidad (u) repetido un número de veces (v) da un total (t)"
        }
        ProblemType::Simple(SimpleKind::Comparacion) => {
            "comparación: una cantidad mayor (cm), una menor (cmen) y su diferencia (d)"
        }
        ProblemType::Simple(SimpleKind::Cambio) => {
            "cambio: una cantidad inicial (ci) que aumenta o disminuye en un cambio (c) hasta una cantidad final (cf)"
        }
        ProblemType::DosOperaciones => {
            "dos operaciones encadenadas: el resultado del primer paso se usa en el segundo"
        }
    }
}

fn slot_object(kind: SimpleKind, value: impl Fn(&str) -> String) -> String {
    let fields: Vec<String> = kind
        .keys()
        .iter()
        .map(|k| format!("\"{k}\": \"{}\"", value(*k)))
        .collect();
    format!("{{{}}}", fields.join(", "))
}

fn example_data(kind: SimpleKind, previous: bool) -> String {
    slot_object(kind, |k| {
        if k == kind.result_key() {
            UNKNOWN_TOKEN.to_string()
        } else if previous && k == kind.keys()[0] {
            PREVIOUS_RESULT_TOKEN.to_string()
        } else {
            "número".to_string()
        }
    })
}

fn example_labels(kind: SimpleKind) -> String {
    slot_object(kind, |k| format!("descripción de {k}"))
}

fn simple_schema(kind: SimpleKind, grade: u8) -> String {
    format!(
        r#"{{
  "grade": {grade},
  "type": "{ty}",
  "question": "enunciado del problema",
  "data": {data},
  "labels": {labels},
  "operation": "+",
  "answer": "número",
  "fullAnswer": "respuesta completa",
  "hint": "pista breve",
  "logicCheck": "verificación del resultado"
}}"#,
        ty = kind.as_str(),
        data = example_data(kind, false),
        labels = example_labels(kind),
    )
}

fn step_schema(kind: SimpleKind, previous: bool) -> String {
    format!(
        r#"{{"type": "{ty}", "data": {data}, "labels": {labels}, "operation": "+", "answer": "número", "hint": "pista del paso"}}"#,
        ty = kind.as_str(),
        data = example_data(kind, previous),
        labels = example_labels(kind),
    )
}

fn two_step_schema(grade: u8) -> String {
    format!(
        r#"{{
  "grade": {grade},
  "type": "{ty}",
  "question": "enunciado del problema completo",
  "steps": [
    {first},
    {second}
  ],
  "answer": "número",
  "fullAnswer": "respuesta completa",
  "hint": "pista breve",
  "logicCheck": "verificación del resultado"
}}"#,
        ty = ProblemType::DOS_OPERACIONES,
        first = step_schema(SimpleKind::Ppt, false),
        second = step_schema(SimpleKind::Uvt, true),
    )
}

fn type_rules(problem_type: ProblemType) -> String {
    match problem_type {
        ProblemType::Simple(kind) => SIMPLE_RULES
            .replace("{keys}", &kind.keys().join(", "))
            .replace("{result_key}", kind.result_key()),
        ProblemType::DosOperaciones => {
            let step_keys: Vec<String> = SimpleKind::ALL
                .iter()
                .map(|k| format!("  - {}: {}", k.as_str(), k.keys().join(", ")))
                .collect();
            TWO_STEP_RULES
                .replace("{step_keys}", &step_keys.join("\n"))
                .replace("{previous}", PREVIOUS_RESULT_TOKEN)
        }
    }
}

/// Builds the full generation prompt. Pure: the same params always yield the same text.
pub fn build_generation_prompt(params: &GenerationParams) -> String {
    let grade = params.grade;
    let schema = match params.problem_type {
        ProblemType::Simple(kind) => simple_schema(kind, grade),
        ProblemType::DosOperaciones => two_step_schema(grade),
    };
    let theme_line = match &params.theme {
        Some(theme) => format!("TEMA: ambienta los problemas en \"{theme}\"\n"),
        None => String::new(),
    };

    GENERATION_PROMPT_TEMPLATE
        .replace("{count}", &params.count.to_string())
        .replace("{grade}", &grade.to_string())
        .replace("{type_description}", type_description(params.problem_type))
        .replace("{type_rules}", &type_rules(params.problem_type))
        .replace("{type}", params.problem_type.as_str())
        .replace("{range_line}", &range_line(grade))
        .replace("{operations_line}", operations_line(grade))
        .replace("{schema}", &schema)
        .replace("{unknown}", UNKNOWN_TOKEN)
        .replace("{json_only}", JSON_ONLY_INSTRUCTION)
        // user text goes in last so it is never scanned for placeholders
        .replace("{theme_line}", &theme_line)
}
