//! Unit tests for the IP pool synchronizer

#[cfg(test)]
mod tests {
    use super::super::ip_pool::*;
    use crate::network::Cidr;
    use crate::test_utils::*;
    use crds::{GlobalInClusterIPPool, GlobalInClusterIPPoolSpec, IPPoolSelector};
    use netbox_client::{MockNetBoxClient, NestedVlan, Prefix};

    fn prefix(id: u64, cidr: &str, site: Option<&str>, role: &str) -> Prefix {
        MockNetBoxClient::new("http://netbox.mock")
            .helpers()
            .create_prefix(id, cidr, site, role)
    }

    fn with_vlan(mut prefix: Prefix, name: &str) -> Prefix {
        prefix.vlan = Some(NestedVlan {
            id: 100,
            name: name.to_string(),
            ..Default::default()
        });
        prefix
    }

    fn selector() -> IPPoolSelector {
        create_test_ip_pool_selector("ippool", "region1", "role1")
    }

    #[tokio::test]
    async fn test_pool_created_for_matching_prefix() {
        let h = create_test_harness();
        let helpers = h.netbox.helpers();
        h.netbox.add_prefix(helpers.create_prefix(1, "10.10.10.0/24", Some("site-1a"), "role1"), "region1");

        h.reconciler
            .reconcile_ip_pool_selectors(&h.netbox, &[selector()])
            .await
            .unwrap();

        let pool = h.ip_pools.get_stored(None, "ippool-site-1a").unwrap();
        assert_eq!(pool.spec.addresses, vec!["10.10.10.0/24"]);
        assert_eq!(pool.spec.prefix, 24);
        assert_eq!(pool.spec.gateway.as_deref(), Some("10.10.10.1"));
        assert!(pool.spec.excluded_addresses.is_empty());
    }

    #[tokio::test]
    async fn test_exclude_mask_not_longer_than_prefix_is_rejected() {
        let h = create_test_harness();
        let helpers = h.netbox.helpers();
        h.netbox.add_prefix(helpers.create_prefix(1, "10.10.10.0/24", Some("site-1a"), "role1"), "region1");
        let selector = IPPoolSelector {
            exclude_mask: Some(24),
            ..selector()
        };

        let err = h
            .reconciler
            .reconcile_ip_pool_selectors(&h.netbox, &[selector])
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "unable to reconcile prefix 10.10.10.0/24 for ip pool ippool: \
             excludeMask (24) must be longer than prefix mask (24) for prefix 10.10.10.0/24"
        );
        assert!(h.ip_pools.all().is_empty());
    }

    #[test]
    fn test_exclude_mask_must_be_longer_than_prefix() {
        let pool_for = |mask: u8| {
            let selector = IPPoolSelector {
                exclude_mask: Some(mask),
                ..selector()
            };
            build_ip_pool(&selector, &prefix(1, "10.10.10.0/24", Some("site-1a"), "role1"))
        };

        for mask in [8, 23, 24] {
            let err = pool_for(mask).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("excludeMask ({mask}) must be longer than prefix mask (24) for prefix 10.10.10.0/24")
            );
        }

        assert_eq!(pool_for(25).unwrap().spec.excluded_addresses, vec!["10.10.10.0/25"]);
        assert_eq!(pool_for(32).unwrap().spec.excluded_addresses, vec!["10.10.10.0/32"]);
    }

    #[test]
    fn test_exclude_mask_longer_than_address_is_rejected() {
        let selector = IPPoolSelector {
            exclude_mask: Some(33),
            ..selector()
        };
        let err = build_ip_pool(&selector, &prefix(1, "10.10.10.0/24", Some("site-1a"), "role1")).unwrap_err();
        assert!(err.to_string().starts_with("excludeMask (33) exceeds address length (32)"));
    }

    #[test]
    fn test_exclusions_keep_their_order() {
        let selector = IPPoolSelector {
            exclude_mask: Some(26),
            excluded_addresses: vec!["10.10.10.100-10.10.10.110".to_string()],
            exclude_last_n_addresses: Some(2),
            ..selector()
        };

        let pool = build_ip_pool(&selector, &prefix(1, "10.10.10.0/24", Some("site-1a"), "role1")).unwrap();
        assert_eq!(
            pool.spec.excluded_addresses,
            vec!["10.10.10.0/26", "10.10.10.100-10.10.10.110", "10.10.10.253", "10.10.10.254"]
        );
    }

    #[test]
    fn test_last_n_exclusion_is_clamped_to_prefix() {
        for (cidr, n) in [("10.10.10.0/30", 10), ("10.10.10.0/29", 6), ("10.10.10.8/31", 5), ("2001:db8::/126", 9)] {
            let selector = IPPoolSelector {
                exclude_last_n_addresses: Some(n),
                ..selector()
            };
            let parsed: Cidr = cidr.parse().unwrap();
            let excluded = excluded_addresses(&selector, &parsed).unwrap();

            let expected = u128::from(n).min(parsed.host_capacity());
            assert_eq!(excluded.len() as u128, expected, "{cidr}");
            for address in &excluded {
                let address: std::net::IpAddr = address.parse().unwrap();
                assert!(parsed.contains(address), "{address} outside {cidr}");
            }
        }
    }

    #[test]
    fn test_compute_transit_naming() {
        let selector = create_test_ip_pool_selector("ippool", "qa-de-1", COMPUTE_TRANSIT_ROLE);
        let prefix = with_vlan(
            prefix(1, "10.20.0.0/28", Some("qa-de-1b"), COMPUTE_TRANSIT_ROLE),
            "cc-compute3-transit",
        );
        assert_eq!(pool_name(&selector, &prefix).unwrap(), "ippool-b2-qa-de-1");
    }

    #[test]
    fn test_compute_number_skips_markers_without_digits() {
        assert_eq!(compute_number("cc-compute3-transit"), Some(3));
        assert_eq!(compute_number("compute-transit-compute3"), Some(3));
        assert_eq!(compute_number("compute12"), Some(12));
        assert_eq!(compute_number("compute-compute"), None);

        let selector = create_test_ip_pool_selector("ippool", "qa-de-1", COMPUTE_TRANSIT_ROLE);
        let prefix = with_vlan(
            prefix(1, "10.20.0.0/28", Some("qa-de-1b"), COMPUTE_TRANSIT_ROLE),
            "compute-transit-compute3",
        );
        assert_eq!(pool_name(&selector, &prefix).unwrap(), "ippool-b2-qa-de-1");
    }

    #[test]
    fn test_compute_transit_naming_errors() {
        let selector = create_test_ip_pool_selector("ippool", "qa-de-1", COMPUTE_TRANSIT_ROLE);

        let no_number = with_vlan(prefix(1, "10.20.0.0/28", Some("qa-de-1b"), COMPUTE_TRANSIT_ROLE), "transit");
        assert!(pool_name(&selector, &no_number)
            .unwrap_err()
            .to_string()
            .starts_with("no compute number found"));

        let zero = with_vlan(prefix(2, "10.20.0.0/28", Some("qa-de-1b"), COMPUTE_TRANSIT_ROLE), "compute0");
        assert!(pool_name(&selector, &zero).unwrap_err().to_string().contains("at least 1"));

        let elsewhere = with_vlan(prefix(3, "10.20.0.0/28", Some("eu-nl-1a"), COMPUTE_TRANSIT_ROLE), "compute1");
        assert_eq!(
            pool_name(&selector, &elsewhere).unwrap_err().to_string(),
            "site eu-nl-1a does not start with region qa-de-1"
        );
    }

    #[test]
    fn test_name_override_is_verbatim() {
        let selector = IPPoolSelector {
            name_prefix: None,
            name_override: Some("my-pool".to_string()),
            ..selector()
        };
        // No site needed when the name is given
        let pool = build_ip_pool(&selector, &prefix(1, "10.10.10.0/24", None, "role1")).unwrap();
        assert_eq!(pool.metadata.name.as_deref(), Some("my-pool"));
    }

    #[test]
    fn test_prefix_without_site_needs_override() {
        let err = pool_name(&selector(), &prefix(1, "10.10.10.0/24", None, "role1")).unwrap_err();
        assert_eq!(err.to_string(), "prefix 10.10.10.0/24 has no site");
    }

    #[test]
    fn test_single_address_prefix_has_no_gateway() {
        let err = build_ip_pool(&selector(), &prefix(1, "10.10.10.7/32", Some("site-1a"), "role1")).unwrap_err();
        assert!(err.to_string().contains("no room for a gateway"));
    }

    #[tokio::test]
    async fn test_existing_pool_is_not_diffed() {
        let h = create_test_harness();
        let helpers = h.netbox.helpers();
        h.netbox.add_prefix(helpers.create_prefix(1, "10.10.10.0/24", Some("site-1a"), "role1"), "region1");
        h.ip_pools.insert(GlobalInClusterIPPool::new(
            "ippool-site-1a",
            GlobalInClusterIPPoolSpec {
                addresses: vec!["10.99.0.0/16".to_string()],
                prefix: 16,
                ..Default::default()
            },
        ));

        h.reconciler
            .reconcile_ip_pool_selectors(&h.netbox, &[selector()])
            .await
            .unwrap();

        let pool = h.ip_pools.get_stored(None, "ippool-site-1a").unwrap();
        assert_eq!(pool.spec.addresses, vec!["10.99.0.0/16"]);
        assert_eq!(h.ip_pools.calls("create"), 0);
    }

    #[tokio::test]
    async fn test_invalid_selector_fails_before_querying() {
        let h = create_test_harness();
        let selector = IPPoolSelector {
            name_prefix: None,
            ..selector()
        };

        let err = h
            .reconciler
            .reconcile_ip_pool_selectors(&h.netbox, &[selector])
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "either namePrefix or nameOverride must be set for ip pool selector (region region1, role role1)"
        );
    }

    #[tokio::test]
    async fn test_one_pool_per_prefix() {
        let h = create_test_harness();
        let helpers = h.netbox.helpers();
        h.netbox.add_prefix(helpers.create_prefix(1, "10.10.10.0/24", Some("site-1a"), "role1"), "region1");
        h.netbox.add_prefix(helpers.create_prefix(2, "10.10.11.0/24", Some("site-1b"), "role1"), "region1");
        h.netbox.add_prefix(helpers.create_prefix(3, "10.10.12.0/24", Some("site-1c"), "role2"), "region1");

        h.reconciler
            .reconcile_ip_pool_selectors(&h.netbox, &[selector()])
            .await
            .unwrap();

        let names: Vec<_> = h
            .ip_pools
            .all()
            .into_iter()
            .filter_map(|p| p.metadata.name)
            .collect();
        assert_eq!(names, vec!["ippool-site-1a", "ippool-site-1b"]);
    }
}
