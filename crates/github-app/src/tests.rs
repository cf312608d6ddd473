/// HTTP behaviour of the app and installation clients against mock servers.
#[cfg(test)]
mod http {
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;
    use zbot_core::platform::{AppClient, EntryKind, PlatformError, RepoRef};

    use crate::{AppKey, GitHubApp, GithubError};

    const PRIVATE_KEY: &str = include_str!("../tests/fixtures/app-key.pem");

    fn app(server: &ServerGuard) -> GitHubApp {
        let key = AppKey::from_pem(PRIVATE_KEY.as_bytes()).unwrap();
        GitHubApp::new(77, key, &server.url()).unwrap()
    }

    fn hello() -> RepoRef {
        RepoRef::new("octo", "hello")
    }

    async fn mock_token(server: &mut ServerGuard, installation: u64) -> mockito::Mock {
        server
            .mock(
                "POST",
                format!("/app/installations/{installation}/access_tokens").as_str(),
            )
            .match_header("authorization", Matcher::Regex("^Bearer .+\\..+\\..+$".into()))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(
                json!({ "token": "ghs_installation", "expires_at": "2030-01-01T00:00:00Z" })
                    .to_string(),
            )
            .create_async()
            .await
    }

    #[tokio::test]
    async fn lists_installations_with_app_jwt() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/app/installations")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "100".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .match_header("authorization", Matcher::Regex("^Bearer ey".into()))
            .match_header("accept", "application/vnd.github+json")
            .match_header("user-agent", Matcher::Regex("^zbot/".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    { "id": 1, "account": { "login": "octo" } },
                    { "id": 2, "account": { "login": "acme" } }
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let installations = app(&server).list_installations().await.unwrap();

        mock.assert_async().await;
        assert_eq!(installations.len(), 2);
        assert_eq!(installations[1].id, 2);
        assert_eq!(installations[1].account, "acme");
    }

    #[tokio::test]
    async fn installation_listing_error_maps_to_credentials() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/app/installations")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(json!({ "message": "Bad credentials" }).to_string())
            .create_async()
            .await;

        let err = app(&server).list_installations().await.unwrap_err();

        assert_eq!(err, PlatformError::Credentials("Bad credentials".into()));
    }

    #[tokio::test]
    async fn reads_rule_files_with_installation_token() {
        let mut server = Server::new_async().await;
        let token = mock_token(&mut server, 9).await;
        let listing = server
            .mock("GET", "/repos/octo/hello/contents/.github/zbot")
            .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
            .match_header("authorization", "Bearer ghs_installation")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    { "name": "a.yaml", "path": ".github/zbot/a.yaml", "type": "file" },
                    { "name": "nested", "path": ".github/zbot/nested", "type": "dir" },
                    { "name": "link", "path": ".github/zbot/link", "type": "symlink" }
                ])
                .to_string(),
            )
            .create_async()
            .await;
        let file = server
            .mock("GET", "/repos/octo/hello/contents/.github/zbot/a.yaml")
            .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
            .match_header("accept", "application/vnd.github.raw+json")
            .with_status(200)
            .with_body("rules: []\n")
            .create_async()
            .await;

        let client = app(&server).installation_client(9).await.unwrap();
        let entries = client.list_dir(&hello(), ".github/zbot", "main").await.unwrap();
        let body = client
            .read_file(&hello(), ".github/zbot/a.yaml", "main")
            .await
            .unwrap();

        token.assert_async().await;
        listing.assert_async().await;
        file.assert_async().await;
        let kinds: Vec<EntryKind> = entries.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EntryKind::File, EntryKind::Dir, EntryKind::Other]);
        assert_eq!(body, "rules: []\n");
    }

    #[tokio::test]
    async fn missing_directory_is_not_found() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server, 9).await;
        let _mock = server
            .mock("GET", "/repos/octo/hello/contents/.github/zbot")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(json!({ "message": "Not Found" }).to_string())
            .create_async()
            .await;

        let client = app(&server).installation_client(9).await.unwrap();
        let err = client
            .list_dir(&hello(), ".github/zbot", "main")
            .await
            .unwrap_err();

        assert!(err.is_not_found(), "{err:?}");
    }

    #[tokio::test]
    async fn token_mint_failure_surfaces_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/app/installations/9/access_tokens")
            .with_status(422)
            .with_body(json!({ "message": "suspended" }).to_string())
            .create_async()
            .await;

        let Err(err) = app(&server).installation_client(9).await else {
            panic!("minting a token for a suspended installation should fail");
        };

        assert_eq!(
            err,
            PlatformError::Status {
                status: 422,
                message: "suspended".into()
            }
        );
    }

    #[tokio::test]
    async fn lists_installation_repositories() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server, 9).await;
        let _mock = server
            .mock("GET", "/installation/repositories")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "total_count": 2,
                    "repositories": [
                        { "name": "hello", "owner": { "login": "octo" } },
                        { "name": "world", "owner": { "login": "octo" } }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = app(&server).installation_client(9).await.unwrap();
        let repos = client.list_repositories().await.unwrap();

        assert_eq!(repos, vec![hello(), RepoRef::new("octo", "world")]);
    }

    #[tokio::test]
    async fn issue_mutations_hit_the_issue_endpoints() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server, 9).await;
        let assign = server
            .mock("POST", "/repos/octo/hello/issues/12/assignees")
            .match_body(Matcher::Json(json!({ "assignees": ["alice"] })))
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;
        let label = server
            .mock("POST", "/repos/octo/hello/issues/12/labels")
            .match_body(Matcher::Json(json!({ "labels": ["bug"] })))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let close = server
            .mock("PATCH", "/repos/octo/hello/issues/12")
            .match_body(Matcher::Json(json!({ "state": "closed" })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = app(&server).installation_client(9).await.unwrap();
        client
            .add_assignees(&hello(), 12, &["alice".to_string()])
            .await
            .unwrap();
        client.add_labels(&hello(), 12, &["bug".to_string()]).await.unwrap();
        client.close_issue(&hello(), 12).await.unwrap();

        assign.assert_async().await;
        label.assert_async().await;
        close.assert_async().await;
    }

    #[tokio::test]
    async fn undecodable_listing_is_decode_error() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server, 9).await;
        let _mock = server
            .mock("GET", "/repos/octo/hello/contents/.github/zbot")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({ "type": "file", "name": "zbot" }).to_string())
            .create_async()
            .await;

        let client = app(&server).installation_client(9).await.unwrap();
        let err = client
            .list_dir(&hello(), ".github/zbot", "main")
            .await
            .unwrap_err();

        assert!(matches!(err, PlatformError::Decode(_)), "{err:?}");
    }

    #[test]
    fn not_found_converts_to_platform_not_found() {
        let err: PlatformError = GithubError::NotFound("/x".into()).into();
        assert!(err.is_not_found());
    }
}
