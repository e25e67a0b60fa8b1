//! The DDI to CMM field table.

use super::shapes::Shape;

/// Paths into a `GetRecord` response carrying a DDI 2.5 codebook.
pub mod paths {
    pub const RECORD_HEADER: &str = "//record/header";
    pub const CODEBOOK: &str = "//metadata/codeBook";

    pub const TITLE: &str = "//codeBook/stdyDscr/citation/titlStmt/titl";
    pub const PARALLEL_TITLE: &str = "//codeBook/stdyDscr/citation/titlStmt/parTitl";
    pub const ABSTRACT: &str = "//codeBook/stdyDscr/stdyInfo/abstract";
    pub const KEYWORDS: &str = "//codeBook/stdyDscr/stdyInfo/subject/keyword";
    pub const CLASSIFICATIONS: &str = "//codeBook/stdyDscr/stdyInfo/subject/topcClas";
    pub const TIME_METHOD: &str = "//codeBook/stdyDscr/method/dataColl/timeMeth";
    pub const MODE_OF_COLLECTION: &str = "//codeBook/stdyDscr/method/dataColl/collMode";
    pub const UNIT_TYPE: &str = "//codeBook/stdyDscr/stdyInfo/sumDscr/anlyUnit";
    pub const SAMPLING_PROCEDURE: &str = "//codeBook/stdyDscr/method/dataColl/sampProc";
    pub const CREATORS: &str = "//codeBook/stdyDscr/citation/rspStmt/AuthEnty";
    pub const COUNTRIES: &str = "//codeBook/stdyDscr/stdyInfo/sumDscr/nation";
    pub const PIDS: &str = "//codeBook/stdyDscr/citation/titlStmt/IDNo";
    pub const COLLECTION_DATES: &str = "//codeBook/stdyDscr/stdyInfo/sumDscr/collDate";
    pub const DATA_ACCESS: &str = "//codeBook/stdyDscr/dataAccs/useStmt/restrctn";
    pub const PUBLISHER: &str = "//codeBook/docDscr/citation/prodStmt/producer";
    pub const STUDY_URL: &str = "//codeBook/stdyDscr/citation/holdings";

    pub const FILE_DESCRIPTION: &str = "//codeBook/fileDscr";
    pub const FILE_NAME: &str = "//codeBook/fileDscr/fileTxt/fileName";
}

/// Language-variable fields of a study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CmmField {
    Title,
    Abstract,
    Keywords,
    Classifications,
    TypeOfTimeMethods,
    TypeOfModeOfCollections,
    UnitTypes,
    TypeOfSamplingProcedures,
    SamplingProcedureFreeTexts,
    Creators,
    StudyAreaCountries,
    PidStudies,
    DataCollectionFreeTexts,
    DataAccessFreeTexts,
    Publisher,
    StudyUrl,
}

/// How values of one language accumulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    /// One value per language; a later element replaces an earlier one.
    Single,
    /// All values per language, in document order.
    Multi,
}

/// One row of the mapping table.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: CmmField,
    /// Evaluated in order; elements of later paths follow those of earlier ones.
    pub paths: &'static [&'static str],
    pub shape: Shape,
    pub multiplicity: Multiplicity,
}

const fn spec(
    field: CmmField,
    paths: &'static [&'static str],
    shape: Shape,
    multiplicity: Multiplicity,
) -> FieldSpec {
    FieldSpec {
        field,
        paths,
        shape,
        multiplicity,
    }
}

use CmmField::*;
use Multiplicity::*;

/// Every language-variable CMM field and where it comes from.
pub const FIELD_TABLE: &[FieldSpec] = &[
    spec(Title, &[paths::TITLE, paths::PARALLEL_TITLE], Shape::Text, Single),
    spec(Abstract, &[paths::ABSTRACT], Shape::Text, Single),
    spec(Keywords, &[paths::KEYWORDS], Shape::Term, Multi),
    spec(Classifications, &[paths::CLASSIFICATIONS], Shape::Term, Multi),
    spec(TypeOfTimeMethods, &[paths::TIME_METHOD], Shape::Term, Multi),
    spec(TypeOfModeOfCollections, &[paths::MODE_OF_COLLECTION], Shape::Term, Multi),
    spec(UnitTypes, &[paths::UNIT_TYPE], Shape::Term, Multi),
    spec(TypeOfSamplingProcedures, &[paths::SAMPLING_PROCEDURE], Shape::Term, Multi),
    spec(SamplingProcedureFreeTexts, &[paths::SAMPLING_PROCEDURE], Shape::OwnText, Single),
    spec(Creators, &[paths::CREATORS], Shape::Creator, Multi),
    spec(StudyAreaCountries, &[paths::COUNTRIES], Shape::Country, Multi),
    spec(PidStudies, &[paths::PIDS], Shape::Pid, Multi),
    spec(DataCollectionFreeTexts, &[paths::COLLECTION_DATES], Shape::EventText, Multi),
    spec(DataAccessFreeTexts, &[paths::DATA_ACCESS], Shape::Text, Multi),
    spec(Publisher, &[paths::PUBLISHER], Shape::Publisher, Single),
    spec(StudyUrl, &[paths::STUDY_URL], Shape::Uri, Single),
];
