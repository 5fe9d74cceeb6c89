mod files;
mod home;
mod upload;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

// Define the OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // General endpoints
        home::root,
        home::health,
        // File endpoints
        files::list_files,
        upload::upload_file,
        files::preview_file,
        files::download_file,
        files::delete_file,
    ),
    components(
        schemas(
            home::HealthResponse,
            files::FileResponse,
            files::ListFilesResponse,
            files::PreviewResponse,
            files::DeleteResponse,
            crate::utils::classifier::FileCategory,
        )
    ),
    tags(
        (name = "General", description = "General API information"),
        (name = "Files", description = "Project file upload, listing, preview, download and deletion")
    ),
    info(
        title = "Project Files API",
        version = "0.1.0",
        description = "File attachments for collaborative projects, stored inline and previewed as inert content",
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

// Add security scheme for JWT Bearer tokens
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::new);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(
                utoipa::openapi::security::Http::new(
                    utoipa::openapi::security::HttpAuthScheme::Bearer
                )
            ),
        );
    }
}

pub fn create_routes(state: AppState) -> Router {
    // Swagger UI (stateless)
    let swagger_router: Router = SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into();

    let upload_limit = usize::try_from(state.policy.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    // Protected routes that require auth
    let protected_routes = Router::new()
        .route(
            "/projects/{project_id}/files",
            get(files::list_files)
                .post(upload::upload_file)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/files/{id}", delete(files::delete_file))
        .route("/files/{id}/preview", get(files::preview_file))
        .route("/files/{id}/download", get(files::download_file))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Public routes (no auth required) and merge all together
    let app_routes = Router::new()
        .route("/", get(home::root))
        .route("/health", get(home::health))
        .merge(protected_routes)
        .with_state(state);

    // Merge Swagger UI (which has no state) with the rest
    Router::new()
        .merge(swagger_router)
        .merge(app_routes)
}
