//! Card phrases in Russian and Kazakh
//!
//! Russian is the default language. "kk/ru" prints the Kazakh phrase
//! followed by the Russian one.

/// Card language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Ru,
    Kk,
    KkRu,
}

impl Language {
    /// Unknown or empty codes fall back to Russian
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "kk" => Language::Kk,
            "kk/ru" => Language::KkRu,
            _ => Language::Ru,
        }
    }

    /// Phrase text with placeholders left in place
    pub fn text(self, phrase: Phrase) -> String {
        match self {
            Language::Ru => phrase.ru().to_string(),
            Language::Kk => phrase.kk().to_string(),
            Language::KkRu => {
                let separator = if phrase.ru().contains('\n') { "\n\n" } else { " / " };
                format!("{}{}{}", phrase.kk(), separator, phrase.ru())
            }
        }
    }

    /// Phrase text with `{name}` placeholders substituted
    pub fn format<V: AsRef<str>>(self, phrase: Phrase, args: &[(&str, V)]) -> String {
        let mut text = self.text(phrase);
        for (name, value) in args {
            text = text.replace(&format!("{{{}}}", name), value.as_ref());
        }
        text
    }
}

/// Every translatable string printed on a card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phrase {
    CardTitle,
    CreationDate,
    BuilderSystem,
    Contents,
    InfoBlock,
    DocumentVisualization,
    SignaturesVisualization,
    AttachmentsList,
    OriginalDocument,
    /// `{signer}`
    SignatureAttachment,
    /// `{id}`
    Iin,
    /// `{name}`, `{id}`
    Organization,
    /// `{page}`, `{total}`
    PageNumber,
    CardFooter,
    DocumentCopy,
    SignatureVisualization,
    /// `{number}`
    SignatureNumber,
    SignatureDate,
    SignedBy,
    Template,
    RepresentsOrganization,
    AllowedUsage,
    /// `{subject}`, `{alt_name}`, `{serial}`, `{from}`, `{until}`, `{issuer}`
    CertificateDetails,
    /// `{generated_at}`, `{subject}`, `{serial}`, `{issuer}`
    TspDetails,
    /// `{status}`, `{generated_at}`, `{subject}`, `{serial}`, `{issuer}`
    OcspDetails,
    /// `{how_to_verify}`
    Notice,
}

impl Phrase {
    fn ru(self) -> &'static str {
        match self {
            Phrase::CardTitle => "КАРТОЧКА ЭЛЕКТРОННОГО ДОКУМЕНТА",
            Phrase::CreationDate => "Дата и время формирования",
            Phrase::BuilderSystem => "Информационная система или сервис",
            Phrase::Contents => "Содержание:",
            Phrase::InfoBlock => "Информационный блок",
            Phrase::DocumentVisualization => "Визуализация электронного документа",
            Phrase::SignaturesVisualization => "Визуализация подписей под электронным документом",
            Phrase::AttachmentsList => "Перечень вложенных файлов:",
            Phrase::OriginalDocument => "Подлинник электронного документа",
            Phrase::SignatureAttachment => "ЭЦП, {signer}",
            Phrase::Iin => "ИИН {id}",
            Phrase::Organization => "{name}, БИН {id}",
            Phrase::PageNumber => "стр. {page} из {total}",
            Phrase::CardFooter => "Карточка электронного документа",
            Phrase::DocumentCopy => "Копия электронного документа",
            Phrase::SignatureVisualization => "Визуализация электронной цифровой подписи",
            Phrase::SignatureNumber => "Подпись №{number}",
            Phrase::SignatureDate => "Дата формирования подписи:",
            Phrase::SignedBy => "Подписал(а):",
            Phrase::Template => "Шаблон:",
            Phrase::RepresentsOrganization => "Представляет организацию:",
            Phrase::AllowedUsage => "Допустимое использование:",
            Phrase::CertificateDetails => {
                "Субъект: {subject}\nАльтернативные имена: {alt_name}\nСерийный номер: {serial}\nС: {from}\nПо: {until}\nИздатель: {issuer}"
            }
            Phrase::TspDetails => {
                "Метка времени: {generated_at}\nСубъект: {subject}\nСерийный номер: {serial}\nИздатель: {issuer}"
            }
            Phrase::OcspDetails => {
                "OCSP: {status}\nСформирован: {generated_at}\nСубъект: {subject}\nСерийный номер: {serial}\nИздатель: {issuer}"
            }
            Phrase::Notice => {
                "Карточка электронного документа - это файл в формате PDF, состоящий из визуально отображаемой части и вложенных файлов.\n\
                 Визуально отображаемая часть карточки электронного документа носит исключительно информативный характер и не обладает юридической значимостью.\n\
                 {how_to_verify}\n\
                 ВНИМАНИЕ! Остерегайтесь мошенников! При получении электронных документов обязательно выполняйте проверку подписей!"
            }
        }
    }

    fn kk(self) -> &'static str {
        match self {
            Phrase::CardTitle => "ЭЛЕКТРОНДЫҚ ҚҰЖАТТЫҢ КАРТОЧКАСЫ",
            Phrase::CreationDate => "Жасалу күні мен уақыты",
            Phrase::BuilderSystem => "Ақпараттық жүйе немесе сервис",
            Phrase::Contents => "Мазмұны:",
            Phrase::InfoBlock => "Ақпараттық блок",
            Phrase::DocumentVisualization => "Электрондық құжатты визуалдау",
            Phrase::SignaturesVisualization => "Электрондық құжатта қол қоюды визуалдау",
            Phrase::AttachmentsList => "Тіркемеленген файлдар тізімі:",
            Phrase::OriginalDocument => "Электрондық құжаттың түпнұсқасы",
            Phrase::SignatureAttachment => "ЭСҚ, {signer}",
            Phrase::Iin => "ЖСН {id}",
            Phrase::Organization => "{name}, БСН {id}",
            Phrase::PageNumber => "{total} беттің {page} беті",
            Phrase::CardFooter => "Электрондық құжат карточкасы",
            Phrase::DocumentCopy => "Электрондық құжаттың көшірмесі",
            Phrase::SignatureVisualization => "Электрондық сандық қолтаңбаның визуалдауы",
            Phrase::SignatureNumber => "Қолтаңба №{number}",
            Phrase::SignatureDate => "Қолтаңба жасалған күн:",
            Phrase::SignedBy => "Қол қойды:",
            Phrase::Template => "Үлгі:",
            Phrase::RepresentsOrganization => "Ұйымға өкілдік етеді:",
            Phrase::AllowedUsage => "Рұқсат етілген пайдалану:",
            Phrase::CertificateDetails => {
                "Субъект: {subject}\nБаламалы есімдер: {alt_name}\nСериялық нөмір: {serial}\nБастап: {from}\nДейін: {until}\nБасып шығарушы: {issuer}"
            }
            Phrase::TspDetails => {
                "Уақыт белгісі: {generated_at}\nСубъект: {subject}\nСериялық нөмір: {serial}\nБасып шығарушы: {issuer}"
            }
            Phrase::OcspDetails => {
                "OCSP: {status}\nҚалыптасты: {generated_at}\nСубъект: {subject}\nСериялық нөмір: {serial}\nБасып шығарушы: {issuer}"
            }
            Phrase::Notice => {
                "Электрондық құжат карточкасы - бұл визуалды түрде көрсетілетін бөліктен және оған қоса берілген файлдардан тұратын PDF файлы.\n\
                 Электрондық құжат карточкасының визуалды көрсетілетін бөлігі тек ақпараттық мақсатта және оның заңдық мәні жоқ.\n\
                 {how_to_verify}\n\
                 НАЗАР АУДАРЫҢЫЗ! Алаяқтардан сақ болыңыз! Электрондық құжаттарды алу кезінде міндетті түрде қолтаңбаларды тексеріңіз!"
            }
        }
    }
}
