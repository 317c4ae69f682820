//! Built-in sample projects for trying search without a scraped dataset.

use crate::documents::Document;

/// One built-in project, borrowed from static text.
struct SampleProject {
    slug: &'static str,
    title: &'static str,
    summary: &'static str,
    full_description: &'static str,
    authors: &'static str,
    status: &'static str,
    date: &'static str,
    topics: &'static str,
}

impl From<&SampleProject> for Document {
    fn from(project: &SampleProject) -> Self {
        Document {
            title: Some(project.title.to_string()),
            summary: Some(project.summary.to_string()),
            full_description: Some(project.full_description.to_string()),
            authors: Some(project.authors.to_string()),
            status: Some(project.status.to_string()),
            date: Some(project.date.to_string()),
            topics: Some(project.topics.to_string()),
            url: Some(format!(
                "https://www.opensafely.org/approved-projects/{}/",
                project.slug
            )),
            identifier: Some(project.slug.to_string()),
            ..Default::default()
        }
    }
}

const SAMPLE_PROJECTS: &[SampleProject] = &[
    SampleProject {
        slug: "covid-vaccine-older-adults",
        title: "COVID-19 vaccine effectiveness in adults over 65",
        summary: "Estimates how well COVID-19 vaccines prevent hospital admission and death in older adults.",
        full_description: "Uses primary care records linked to hospital and death data to compare outcomes \
                  between vaccinated and unvaccinated older adults, by vaccine brand, dose and time \
                  since vaccination, including people with underlying conditions.",
        authors: "A. Patel, R. Okafor",
        status: "Completed",
        date: "2023-09-15",
        topics: "COVID-19, Vaccination, Older people",
    },
    SampleProject {
        slug: "mental-health-lockdown",
        title: "Mental health service use during pandemic lockdowns",
        summary: "Describes changes in consultations and prescribing for anxiety and depression across lockdown periods.",
        full_description: "Tracks primary care consultations, antidepressant prescriptions and referrals to \
                  specialist services before, during and after each national lockdown, broken down \
                  by age, ethnicity and deprivation.",
        authors: "L. Brennan, M. Osei",
        status: "Ongoing",
        date: "2023-06-20",
        topics: "Mental health, COVID-19, Health services",
    },
    SampleProject {
        slug: "diabetes-medication-adherence",
        title: "Diabetes medication adherence and glycaemic control",
        summary: "Studies how regularly people with type 2 diabetes collect their medication and how that relates to HbA1c.",
        full_description: "Measures repeat prescription coverage for metformin and other glucose-lowering \
                  drugs and links it to HbA1c results, complications and admissions, looking at \
                  socioeconomic factors and comorbidity.",
        authors: "J. Whitfield, S. Kaur",
        status: "Completed",
        date: "2023-12-01",
        topics: "Diabetes, Medication, Chronic disease",
    },
    SampleProject {
        slug: "cardiovascular-risk-young-adults",
        title: "Cardiovascular risk in young adults",
        summary: "Looks at blood pressure, cholesterol and smoking records in adults aged 18 to 40.",
        full_description: "Describes how often cardiovascular risk factors are recorded and treated in young \
                  adults and how recording changed during the pandemic.",
        authors: "E. Novak",
        status: "Ongoing",
        date: "2024-02-11",
        topics: "Cardiovascular disease, Prevention",
    },
    SampleProject {
        slug: "cancer-screening-uptake",
        title: "Cancer screening uptake after service disruption",
        summary: "Measures recovery of breast, bowel and cervical screening after pandemic pauses.",
        full_description: "Compares monthly screening rates against pre-pandemic trends and identifies \
                  practices and populations where uptake has not recovered.",
        authors: "H. Lindqvist, O. Adeyemi",
        status: "Completed",
        date: "2022-11-30",
        topics: "Cancer, Screening, Health services",
    },
    SampleProject {
        slug: "antibiotic-prescribing-primary-care",
        title: "Antibiotic prescribing in primary care",
        summary: "Monitors antibiotic prescribing volumes and broad-spectrum use across general practices.",
        full_description: "Reports practice-level antibiotic prescribing for common infections and tests \
                  whether remote consultations changed prescribing behaviour.",
        authors: "C. Moreau",
        status: "Ongoing",
        date: "2023-03-08",
        topics: "Antimicrobial resistance, Prescribing",
    },
];

pub fn sample_documents() -> Vec<Document> {
    SAMPLE_PROJECTS.iter().map(Document::from).collect()
}
