use crate::api::attendance::{
    AttendanceActionResponse, AttendanceListResponse, ChildDayRecord, ChildStatusResponse,
    RecordsResponse, SignInRequest, SignOutRequest,
};
use crate::api::center::{CenterListResponse, CenterQuery, CreateCenter, UpdateCenter};
use crate::api::child::{
    ChildListResponse, ChildProfile, ChildQuery, ChildSearchHit, CreateChild, UpdateChild,
};
use crate::api::dashboard::{Dashboard, SignedInChild};
use crate::api::notification::NotificationListResponse;
use crate::api::parent::{CreateParent, ParentDetail, ParentListResponse, ParentQuery, UpdateParent};
use crate::api::report::{ActiveChild, ChildDayRow, ChildReport, SummaryReport};
use crate::api::teacher::{CreateTeacher, TeacherListResponse, UpdateTeacher};
use crate::model::attendance::{Attendance, AttendanceAction, AttendanceStatus, DaySummary};
use crate::model::center::Center;
use crate::model::child::{Child, ChildListing, Gender};
use crate::model::notification::{Notification, NotificationKind};
use crate::model::parent::Parent;
use crate::model::teacher::Teacher;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Childcare Attendance API",
        version = "1.0.0",
        description = r#"
## Childcare Attendance

Staff-facing API for signing children in and out of childcare centers.

### Key Features
- **Centers, parents and children**: registration and profiles
- **Attendance**: sign-in / sign-out with lateness against the center opening time
- **Notifications**: late-arrival alerts
- **Reports**: daily summaries, per-child history, CSV and PDF exports

### Security
Endpoints under the API prefix require a **JWT Bearer** access token from
`/auth/login`. Center, teacher and report management is limited to **Admin**.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::center::create_center,
        crate::api::center::list_centers,
        crate::api::center::get_center,
        crate::api::center::update_center,
        crate::api::center::delete_center,

        crate::api::parent::create_parent,
        crate::api::parent::list_parents,
        crate::api::parent::get_parent,
        crate::api::parent::update_parent,
        crate::api::parent::delete_parent,

        crate::api::child::create_child,
        crate::api::child::list_children,
        crate::api::child::search_children,
        crate::api::child::get_child,
        crate::api::child::child_profile,
        crate::api::child::update_child,
        crate::api::child::delete_child,

        crate::api::teacher::create_teacher,
        crate::api::teacher::list_teachers,
        crate::api::teacher::get_teacher,
        crate::api::teacher::update_teacher,
        crate::api::teacher::delete_teacher,

        crate::api::attendance::sign_in,
        crate::api::attendance::sign_out,
        crate::api::attendance::child_status,
        crate::api::attendance::attendance_records,
        crate::api::attendance::list_attendance,

        crate::api::dashboard::dashboard,

        crate::api::notification::list_notifications,
        crate::api::notification::mark_read,

        crate::api::report::summary,
        crate::api::report::child_report,
        crate::api::report::export_csv,
        crate::api::report::export_pdf
    ),
    components(
        schemas(
            Center,
            CreateCenter,
            UpdateCenter,
            CenterQuery,
            CenterListResponse,
            Parent,
            CreateParent,
            UpdateParent,
            ParentQuery,
            ParentDetail,
            ParentListResponse,
            Child,
            Gender,
            ChildListing,
            CreateChild,
            UpdateChild,
            ChildQuery,
            ChildListResponse,
            ChildSearchHit,
            ChildProfile,
            Teacher,
            CreateTeacher,
            UpdateTeacher,
            TeacherListResponse,
            Attendance,
            AttendanceStatus,
            AttendanceAction,
            DaySummary,
            SignInRequest,
            SignOutRequest,
            AttendanceActionResponse,
            ChildStatusResponse,
            ChildDayRecord,
            RecordsResponse,
            AttendanceListResponse,
            Dashboard,
            SignedInChild,
            Notification,
            NotificationKind,
            NotificationListResponse,
            SummaryReport,
            ActiveChild,
            ChildDayRow,
            ChildReport
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Center", description = "Childcare center management"),
        (name = "Parent", description = "Parent records"),
        (name = "Child", description = "Child records, search and profiles"),
        (name = "Teacher", description = "Teacher profiles (admin)"),
        (name = "Attendance", description = "Sign-in, sign-out and daily records"),
        (name = "Dashboard", description = "Today's overview"),
        (name = "Notification", description = "Late-arrival notifications"),
        (name = "Report", description = "Summaries and exports (admin)"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_registers_bearer_scheme_and_paths() {
        let doc = ApiDoc::openapi();
        let components = doc.components.as_ref().unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(doc.paths.paths.contains_key("/api/attendance/sign-in"));
        assert!(doc.paths.paths.contains_key("/api/reports/attendance.pdf"));
    }
}
