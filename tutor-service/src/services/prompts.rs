//! Tutor personas and instructions sent to the model.

/// Feedback language requested by the client.
///
/// Only Spanish is recognised explicitly; every other code gets English.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Spanish,
    English,
}

impl Language {
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("es") => Language::Spanish,
            _ => Language::English,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::Spanish => "es",
            Language::English => "en",
        }
    }
}

const SPANISH_WRITING_TUTOR: &str = "Eres un tutor de escritura profesional. Analiza la siguiente frase que te proporciono. Proporciona feedback sobre gramática, claridad y estilo, y posibles alternativas para mejorarla. No menciones el idioma en el que está escrita la frase ni la traduzcas. Responde de forma amigable y concisa, en español, en no más de dos párrafos.";

const ENGLISH_WRITING_TUTOR: &str = "You are a professional writing tutor. Analyze the following sentence. Provide feedback on grammar, clarity, and style. For a business or formal context, suggest more specific, quoted alternative phrases. For a casual context, suggest more idiomatic or colloquial, quoted alternative phrases. Do not mention the original language of the sentence or translate it. Respond in a friendly and concise manner, in English, in no more than two paragraphs.";

const SPANISH_PRONUNCIATION_TUTOR: &str = concat!(
    "Eres un tutor de pronunciación profesional. Analiza el audio del usuario. ",
    "Proporciona una transcripción del audio y un análisis de pronunciación. ",
    "La respuesta debe ser un objeto JSON con dos claves: 'transcribedText' (la transcripción) y 'wordFeedback' (un array de objetos para cada palabra). ",
    "Cada objeto en el array 'wordFeedback' debe tener estas claves: 'word' (la palabra), 'correctlyPronounced' (booleano: true o false) y 'feedback' (un string detallado para esa palabra). ",
    "Proporciona feedback específico y detallado para cada palabra. Sé constructivo."
);

const ENGLISH_PRONUNCIATION_TUTOR: &str = concat!(
    "You are a professional pronunciation tutor. Analyze the user's audio. ",
    "Provide a transcription of the audio and a pronunciation analysis. ",
    "The response should be a JSON object with two keys: 'transcribedText' (the transcription) and 'wordFeedback' (an array of objects for each word). ",
    "Each object in the 'wordFeedback' array should have these keys: 'word' (the word), 'correctlyPronounced' (boolean: true or false), and 'feedback' (a detailed string for that word). ",
    "Provide specific and detailed feedback for each word. Be constructive."
);

/// Writing-feedback prompt embedding the learner's sentence.
pub fn writing_feedback_prompt(language: Language, sentence: &str) -> String {
    match language {
        Language::Spanish => format!("{}\n\nFrase: \"{}\"\n", SPANISH_WRITING_TUTOR, sentence),
        Language::English => format!("{}\n\nSentence: \"{}\"\n", ENGLISH_WRITING_TUTOR, sentence),
    }
}

/// Instruction accompanying a pronunciation recording.
pub fn pronunciation_instruction(language: Language) -> &'static str {
    match language {
        Language::Spanish => SPANISH_PRONUNCIATION_TUTOR,
        Language::English => ENGLISH_PRONUNCIATION_TUTOR,
    }
}
